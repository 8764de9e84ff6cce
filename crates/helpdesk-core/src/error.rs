use thiserror::Error;

#[derive(Debug, Error)]
pub enum HelpdeskError {
    #[error("not initialized: run 'helpdesk init'")]
    NotInitialized,

    #[error("ticket not found: {0}")]
    TicketNotFound(String),

    #[error("ticket already exists: {0}")]
    TicketExists(String),

    #[error("invalid ticket id '{0}': must be alphanumeric with hyphens or underscores")]
    InvalidTicketId(String),

    #[error("malformed ticket: missing required field '{field}'")]
    MalformedTicket { field: &'static str },

    #[error("invalid ticket: {0}")]
    InvalidTicket(String),

    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("unknown status: {0}")]
    UnknownStatus(String),

    #[error("unknown tier: {0}")]
    UnknownTier(String),

    #[error("unknown severity: {0}")]
    UnknownSeverity(String),

    #[error("{transition} not permitted: {reason}")]
    IllegalTransition { transition: String, reason: String },

    #[error("rejected by server: {0}")]
    TransitionRejected(String),

    #[error("another change to ticket {0} is still in flight")]
    TransitionInFlight(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl HelpdeskError {
    /// Message shown to a user whose request lost a race with another change.
    pub const STALE_SNAPSHOT: &'static str = "this ticket changed, please retry";

    /// True when the caller should refetch the ticket and re-evaluate.
    pub fn needs_refresh(&self) -> bool {
        matches!(self, HelpdeskError::IllegalTransition { .. })
    }

    /// Text suitable for the person who triggered the action.
    ///
    /// Server rejections are passed through verbatim; local policy refusals
    /// collapse to a retry hint since the snapshot was probably stale.
    pub fn user_message(&self) -> String {
        match self {
            HelpdeskError::TransitionRejected(msg) => msg.clone(),
            HelpdeskError::IllegalTransition { .. } => Self::STALE_SNAPSHOT.to_string(),
            HelpdeskError::MalformedTicket { .. } => "this ticket cannot be displayed".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HelpdeskError>;
