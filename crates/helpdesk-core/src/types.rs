use crate::error::HelpdeskError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Tier
// ---------------------------------------------------------------------------

/// Support level currently responsible for a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    L1,
    L2,
    L3,
}

impl Tier {
    pub fn all() -> &'static [Tier] {
        &[Tier::L1, Tier::L2, Tier::L3]
    }

    /// The tier a ticket moves to when escalated from this one.
    pub fn next(self) -> Option<Tier> {
        match self {
            Tier::L1 => Some(Tier::L2),
            Tier::L2 => Some(Tier::L3),
            Tier::L3 => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::L1 => "L1",
            Tier::L2 => "L2",
            Tier::L3 => "L3",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = HelpdeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "L1" => Ok(Tier::L1),
            "L2" => Ok(Tier::L2),
            "L3" => Ok(Tier::L3),
            _ => Err(HelpdeskError::UnknownTier(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    L1,
    L2,
    L3,
    #[serde(rename = "ADMIN")]
    Admin,
}

impl Role {
    pub fn all() -> &'static [Role] {
        &[Role::L1, Role::L2, Role::L3, Role::Admin]
    }

    /// The tier this role works at. Admins sit outside the tier ladder.
    pub fn tier(self) -> Option<Tier> {
        match self {
            Role::L1 => Some(Tier::L1),
            Role::L2 => Some(Tier::L2),
            Role::L3 => Some(Tier::L3),
            Role::Admin => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::L1 => "L1",
            Role::L2 => "L2",
            Role::L3 => "L3",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = HelpdeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "L1" => Ok(Role::L1),
            "L2" => Ok(Role::L2),
            "L3" => Ok(Role::L3),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(HelpdeskError::UnknownRole(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// TicketStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketStatus {
    New,
    Attending,
    Completed,
    Escalated,
    Resolved,
}

impl TicketStatus {
    pub fn all() -> &'static [TicketStatus] {
        &[
            TicketStatus::New,
            TicketStatus::Attending,
            TicketStatus::Completed,
            TicketStatus::Escalated,
            TicketStatus::Resolved,
        ]
    }

    /// Completed or Resolved: no further escalation, severity edits or
    /// resolve offers.
    pub fn is_closed(self) -> bool {
        matches!(self, TicketStatus::Completed | TicketStatus::Resolved)
    }

    /// Counted as open work on the dashboard.
    pub fn is_open(self) -> bool {
        matches!(
            self,
            TicketStatus::New | TicketStatus::Attending | TicketStatus::Escalated
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::New => "New",
            TicketStatus::Attending => "Attending",
            TicketStatus::Completed => "Completed",
            TicketStatus::Escalated => "Escalated",
            TicketStatus::Resolved => "Resolved",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TicketStatus {
    type Err = HelpdeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "new" => Ok(TicketStatus::New),
            "attending" => Ok(TicketStatus::Attending),
            "completed" => Ok(TicketStatus::Completed),
            "escalated" => Ok(TicketStatus::Escalated),
            "resolved" => Ok(TicketStatus::Resolved),
            _ => Err(HelpdeskError::UnknownStatus(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Classification assigned at tier L2. C1 is the most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    C1,
    C2,
    C3,
}

impl Severity {
    pub fn all() -> &'static [Severity] {
        &[Severity::C1, Severity::C2, Severity::C3]
    }

    /// C1 and C2 tickets may reach and be worked at the top tier.
    pub fn is_escalation_grade(self) -> bool {
        matches!(self, Severity::C1 | Severity::C2)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::C1 => "C1",
            Severity::C2 => "C2",
            Severity::C3 => "C3",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::C1 => "Critical (C1)",
            Severity::C2 => "High (C2)",
            Severity::C3 => "Medium (C3)",
        }
    }
}

/// Display label for an optional severity.
pub fn severity_label(severity: Option<Severity>) -> &'static str {
    severity.map(Severity::label).unwrap_or("Not Set")
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = HelpdeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "C1" => Ok(Severity::C1),
            "C2" => Ok(Severity::C2),
            "C3" => Ok(Severity::C3),
            _ => Err(HelpdeskError::UnknownSeverity(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = HelpdeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(HelpdeskError::InvalidTicket(format!(
                "unknown priority '{s}': must be Low, Medium, or High"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Technical Support")]
    TechnicalSupport,
    #[serde(rename = "Software Issue")]
    SoftwareIssue,
    #[serde(rename = "Hardware Issue")]
    HardwareIssue,
    #[serde(rename = "Network Problem")]
    NetworkProblem,
    #[serde(rename = "Access Request")]
    AccessRequest,
    #[default]
    #[serde(rename = "General Inquiry")]
    GeneralInquiry,
}

impl Category {
    pub fn all() -> &'static [Category] {
        &[
            Category::TechnicalSupport,
            Category::SoftwareIssue,
            Category::HardwareIssue,
            Category::NetworkProblem,
            Category::AccessRequest,
            Category::GeneralInquiry,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::TechnicalSupport => "Technical Support",
            Category::SoftwareIssue => "Software Issue",
            Category::HardwareIssue => "Hardware Issue",
            Category::NetworkProblem => "Network Problem",
            Category::AccessRequest => "Access Request",
            Category::GeneralInquiry => "General Inquiry",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = HelpdeskError;

    /// Accepts the display name or a kebab/snake form (`software-issue`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_ascii_lowercase().replace(['-', '_'], " ");
        Category::all()
            .iter()
            .copied()
            .find(|c| c.as_str().to_ascii_lowercase() == wanted)
            .ok_or_else(|| HelpdeskError::InvalidTicket(format!("unknown category '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
