//! Ticket state model.
//!
//! A [`Ticket`] is one consistent snapshot of a ticket's lifecycle fields
//! plus its append-only activity log. Snapshots are never patched in place
//! outside this crate: callers receive a fresh `Ticket` from the store after
//! every successful change and replace the old one wholesale.
//!
//! Remote payloads arrive as [`TicketRecord`], where every field is optional.
//! Converting a record into a `Ticket` rejects missing `id`, `status` or
//! `currentTier` with [`HelpdeskError::MalformedTicket`]. Deserializing a
//! `Ticket` always runs that conversion.

use crate::error::{HelpdeskError, Result};
use crate::types::{Category, Priority, Role, Severity, TicketStatus, Tier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// The authenticated caller, as supplied by the identity layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }
}

// ---------------------------------------------------------------------------
// Activity log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Created,
    StatusChanged,
    SeverityChanged,
    Escalated,
    Resolved,
    Note,
}

impl std::fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActivityAction::Created => "created",
            ActivityAction::StatusChanged => "status_changed",
            ActivityAction::SeverityChanged => "severity_changed",
            ActivityAction::Escalated => "escalated",
            ActivityAction::Resolved => "resolved",
            ActivityAction::Note => "note",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub actor: Actor,
    pub action: ActivityAction,
    #[serde(default)]
    pub detail: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationRecord {
    pub from_tier: Tier,
    pub to_tier: Tier,
    pub reason: String,
    pub escalated_by: Actor,
    pub at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Ticket
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "TicketRecord")]
pub struct Ticket {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) category: Category,
    pub(crate) priority: Priority,
    pub(crate) status: TicketStatus,
    pub(crate) current_tier: Tier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) severity: Option<Severity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) due_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) resolution: Option<String>,
    pub(crate) escalation_history: Vec<EscalationRecord>,
    pub(crate) activity_log: Vec<ActivityEntry>,
}

impl Ticket {
    /// Open a fresh ticket at `New / L1 / unset`, logging its creation.
    ///
    /// Field validation is the caller's job (see [`NewTicket::validate`]).
    pub fn open(id: impl Into<String>, new: NewTicket, creator: &Actor, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: new.title,
            description: new.description,
            category: new.category,
            priority: new.priority,
            status: TicketStatus::New,
            current_tier: Tier::L1,
            severity: None,
            due_date: Some(new.due_date),
            created_by: Some(creator.id.clone()),
            created_at: Some(now),
            updated_at: Some(now),
            resolution: None,
            escalation_history: Vec::new(),
            activity_log: vec![ActivityEntry {
                actor: creator.clone(),
                action: ActivityAction::Created,
                detail: "Ticket created".to_string(),
                timestamp: now,
            }],
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn status(&self) -> TicketStatus {
        self.status
    }

    pub fn current_tier(&self) -> Tier {
        self.current_tier
    }

    pub fn severity(&self) -> Option<Severity> {
        self.severity
    }

    pub fn due_date(&self) -> Option<DateTime<Utc>> {
        self.due_date
    }

    pub fn created_by(&self) -> Option<&str> {
        self.created_by.as_deref()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn resolution(&self) -> Option<&str> {
        self.resolution.as_deref()
    }

    pub fn escalation_history(&self) -> &[EscalationRecord] {
        &self.escalation_history
    }

    pub fn activity_log(&self) -> &[ActivityEntry] {
        &self.activity_log
    }

    /// Reason given for the most recent escalation, if any.
    pub fn escalation_notes(&self) -> Option<&str> {
        self.escalation_history.last().map(|e| e.reason.as_str())
    }

    /// Past due and not yet Resolved. No action is permitted on a frozen
    /// ticket regardless of role.
    pub fn is_frozen(&self, now: DateTime<Utc>) -> bool {
        match self.due_date {
            Some(due) => now > due && self.status != TicketStatus::Resolved,
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// TicketRecord (remote representation)
// ---------------------------------------------------------------------------

/// Loose wire shape of a ticket. Field aliases accept the names used by the
/// legacy REST API (`_id`, `currentLevel`, `criticalValue`,
/// `expectedCompletionDate`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketRecord {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "currentLevel")]
    pub current_tier: Option<String>,
    #[serde(default, alias = "criticalValue")]
    pub severity: Option<String>,
    #[serde(default, alias = "expectedCompletionDate")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub escalation_history: Vec<EscalationRecord>,
    #[serde(default)]
    pub activity_log: Vec<ActivityEntry>,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl TryFrom<TicketRecord> for Ticket {
    type Error = HelpdeskError;

    fn try_from(r: TicketRecord) -> Result<Self> {
        let id = present(r.id).ok_or(HelpdeskError::MalformedTicket { field: "id" })?;
        let status = present(r.status)
            .ok_or(HelpdeskError::MalformedTicket { field: "status" })?
            .parse::<TicketStatus>()?;
        let current_tier = present(r.current_tier)
            .ok_or(HelpdeskError::MalformedTicket {
                field: "currentTier",
            })?
            .parse::<Tier>()?;
        // An empty string is how the backend spells "not classified yet".
        let severity = present(r.severity)
            .map(|s| s.parse::<Severity>())
            .transpose()?;

        Ok(Ticket {
            id,
            title: r.title.unwrap_or_default(),
            description: r.description.unwrap_or_default(),
            category: r.category.unwrap_or_default(),
            priority: r.priority.unwrap_or_default(),
            status,
            current_tier,
            severity,
            due_date: r.due_date,
            created_by: r.created_by,
            created_at: r.created_at,
            updated_at: r.updated_at,
            resolution: r.resolution,
            escalation_history: r.escalation_history,
            activity_log: r.activity_log,
        })
    }
}

impl From<Ticket> for TicketRecord {
    fn from(t: Ticket) -> Self {
        TicketRecord {
            id: Some(t.id),
            title: Some(t.title),
            description: Some(t.description),
            category: Some(t.category),
            priority: Some(t.priority),
            status: Some(t.status.to_string()),
            current_tier: Some(t.current_tier.to_string()),
            severity: t.severity.map(|s| s.to_string()),
            due_date: t.due_date,
            created_by: t.created_by,
            created_at: t.created_at,
            updated_at: t.updated_at,
            resolution: t.resolution,
            escalation_history: t.escalation_history,
            activity_log: t.activity_log,
        }
    }
}

// ---------------------------------------------------------------------------
// NewTicket (creation form)
// ---------------------------------------------------------------------------

pub const MIN_TITLE_LEN: usize = 5;
pub const MIN_DESCRIPTION_LEN: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub priority: Priority,
    #[serde(alias = "expectedCompletionDate")]
    pub due_date: DateTime<Utc>,
}

impl NewTicket {
    /// Form-level checks, independent of lifecycle rules.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<()> {
        if self.title.trim().chars().count() < MIN_TITLE_LEN {
            return Err(HelpdeskError::InvalidTicket(format!(
                "title must be at least {MIN_TITLE_LEN} characters"
            )));
        }
        if self.description.trim().chars().count() < MIN_DESCRIPTION_LEN {
            return Err(HelpdeskError::InvalidTicket(format!(
                "description must be at least {MIN_DESCRIPTION_LEN} characters"
            )));
        }
        let start_of_today = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|d| d.and_utc())
            .unwrap_or(now);
        if self.due_date < start_of_today {
            return Err(HelpdeskError::InvalidTicket(
                "due date cannot be in the past".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
