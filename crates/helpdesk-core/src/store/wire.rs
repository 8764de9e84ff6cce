//! JSON shapes exchanged between the server and [`super::HttpStore`].

use crate::error::{HelpdeskError, Result};
use crate::store::{Pagination, TicketPage};
use crate::ticket::{Ticket, TicketRecord};
use crate::types::{Severity, TicketStatus, Tier};
use serde::{Deserialize, Serialize};

/// Response wrapper used by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl<T> Envelope<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            errors: Vec::new(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            errors: Vec::new(),
        }
    }
}

/// Page as it travels over the wire; tickets are validated on arrival.
#[derive(Debug, Clone, Deserialize)]
pub struct PageRecord {
    pub tickets: Vec<TicketRecord>,
    pub pagination: Pagination,
}

impl TryFrom<PageRecord> for TicketPage {
    type Error = HelpdeskError;

    fn try_from(p: PageRecord) -> Result<Self> {
        let tickets = p
            .tickets
            .into_iter()
            .map(Ticket::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(TicketPage {
            tickets,
            pagination: p.pagination,
        })
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusBody {
    pub status: TicketStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeverityBody {
    pub critical_value: Severity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalateBody {
    /// When given, must name the tier the policy would escalate to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_level: Option<Tier>,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl EscalateBody {
    /// Reason and optional notes folded into one escalation reason.
    pub fn full_reason(&self) -> String {
        match self.notes.as_deref().map(str::trim) {
            Some(notes) if !notes.is_empty() => format!("{} ({notes})", self.reason.trim()),
            _ => self.reason.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveBody {
    pub resolution: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteBody {
    #[serde(default)]
    pub action: String,
    pub details: String,
}
