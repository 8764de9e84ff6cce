use crate::error::{HelpdeskError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const HELPDESK_DIR: &str = ".helpdesk";
pub const TICKETS_DIR: &str = ".helpdesk/tickets";
pub const CONFIG_FILE: &str = ".helpdesk/config.yaml";

pub const TICKET_ID_PREFIX: &str = "TCK-";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn helpdesk_dir(root: &Path) -> PathBuf {
    root.join(HELPDESK_DIR)
}

pub fn tickets_dir(root: &Path) -> PathBuf {
    root.join(TICKETS_DIR)
}

pub fn ticket_path(root: &Path, id: &str) -> PathBuf {
    tickets_dir(root).join(format!("{id}.yaml"))
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

// ---------------------------------------------------------------------------
// Ticket id validation
// ---------------------------------------------------------------------------

fn ticket_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").expect("static regex"))
}

/// Ids become file names, so anything that could escape the tickets
/// directory is refused.
pub fn validate_ticket_id(id: &str) -> Result<()> {
    if id.is_empty() || id.len() > 64 || !ticket_id_re().is_match(id) {
        return Err(HelpdeskError::InvalidTicketId(id.to_string()));
    }
    Ok(())
}

/// `TCK-` followed by eight hex digits of a fresh v4 uuid, upper-cased.
pub fn generate_ticket_id() -> String {
    let raw = uuid::Uuid::new_v4().simple().to_string();
    format!("{TICKET_ID_PREFIX}{}", raw[..8].to_ascii_uppercase())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
