use crate::output::{print_fields, print_json, print_table};
use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use clap::Subcommand;
use helpdesk_core::policy::PolicyDecision;
use helpdesk_core::session::TicketSession;
use helpdesk_core::store::{TicketQuery, TicketStore};
use helpdesk_core::types::{severity_label, Category, Priority, Severity, TicketStatus, Tier};
use helpdesk_core::{NewTicket, Ticket, Transition};
use std::path::Path;

use super::Identity;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum TicketSubcommand {
    /// Open a new ticket at L1
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        /// e.g. "Software Issue" or software-issue
        #[arg(long, default_value = "General Inquiry")]
        category: Category,
        /// Low, Medium or High
        #[arg(long, default_value = "Medium")]
        priority: Priority,
        /// RFC 3339 timestamp, or YYYY-MM-DD for the end of that day (UTC)
        #[arg(long, value_parser = parse_due_date)]
        due: DateTime<Utc>,
    },

    /// List tickets, newest first
    List {
        #[arg(long)]
        status: Option<TicketStatus>,
        #[arg(long)]
        priority: Option<Priority>,
        /// Current tier: L1, L2 or L3
        #[arg(long)]
        level: Option<Tier>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Show one ticket with its activity log
    Show { id: String },

    /// Show what the acting user may do with a ticket
    Policy { id: String },

    /// New/Escalated → Attending
    Start { id: String },

    /// Attending → Completed
    Complete { id: String },

    /// Write a status directly
    Status { id: String, status: TicketStatus },

    /// Set severity (C1, C2, C3)
    Severity { id: String, severity: Severity },

    /// Move the ticket one tier up
    Escalate {
        id: String,
        #[arg(long)]
        reason: String,
    },

    /// Completed → Resolved
    Close {
        id: String,
        #[arg(long)]
        resolution: String,
    },

    /// Append a note to the activity log
    Note {
        id: String,
        #[arg(long)]
        details: String,
        /// Short label recorded before the details, e.g. "called user"
        #[arg(long)]
        action: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(
    root: &Path,
    identity: &Identity,
    subcmd: TicketSubcommand,
    json: bool,
) -> anyhow::Result<()> {
    match subcmd {
        TicketSubcommand::Create {
            title,
            description,
            category,
            priority,
            due,
        } => {
            let new = NewTicket {
                title,
                description,
                category,
                priority,
                due_date: due,
            };
            create(root, identity, new, json)
        }
        TicketSubcommand::List {
            status,
            priority,
            level,
            page,
            limit,
        } => {
            let query = TicketQuery {
                status,
                priority,
                tier: level,
                page,
                limit,
            };
            list(root, &query, json)
        }
        TicketSubcommand::Show { id } => show(root, &id, json),
        TicketSubcommand::Policy { id } => policy(root, identity, &id, json),
        TicketSubcommand::Start { id } => transition(root, identity, &id, Transition::StartWork, json),
        TicketSubcommand::Complete { id } => {
            transition(root, identity, &id, Transition::Complete, json)
        }
        TicketSubcommand::Status { id, status } => {
            transition(root, identity, &id, Transition::UpdateStatus(status), json)
        }
        TicketSubcommand::Severity { id, severity } => {
            transition(root, identity, &id, Transition::SetSeverity(severity), json)
        }
        TicketSubcommand::Escalate { id, reason } => {
            transition(root, identity, &id, Transition::Escalate { reason }, json)
        }
        TicketSubcommand::Close { id, resolution } => {
            transition(root, identity, &id, Transition::Close { resolution }, json)
        }
        TicketSubcommand::Note {
            id,
            details,
            action,
        } => transition(
            root,
            identity,
            &id,
            Transition::AddNote {
                action: action.unwrap_or_default(),
                details,
            },
            json,
        ),
    }
}

/// Accepts `2025-06-30T17:00:00Z` or `2025-06-30` (23:59:59 UTC that day).
fn parse_due_date(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("invalid due date '{s}': use YYYY-MM-DD or RFC 3339"))
}

// ---------------------------------------------------------------------------
// create / list / show
// ---------------------------------------------------------------------------

fn create(root: &Path, identity: &Identity, new: NewTicket, json: bool) -> anyhow::Result<()> {
    let actor = identity.resolve()?;
    let store = super::open_store(root)?;
    let ticket = store.create(&actor, new).context("failed to create ticket")?;
    if json {
        print_json(&ticket)?;
    } else {
        println!("Created {}: {}", ticket.id(), ticket.title());
    }
    Ok(())
}

fn list(root: &Path, query: &TicketQuery, json: bool) -> anyhow::Result<()> {
    let page = super::open_store(root)?.list(query)?;
    if json {
        return print_json(&page);
    }
    if page.tickets.is_empty() {
        println!("No tickets.");
        return Ok(());
    }
    let rows = page
        .tickets
        .iter()
        .map(|t| {
            vec![
                t.id().to_string(),
                t.status().to_string(),
                t.current_tier().to_string(),
                severity_label(t.severity()).to_string(),
                t.priority().to_string(),
                format_due(t.due_date()),
                t.title().to_string(),
            ]
        })
        .collect();
    print_table(
        &["ID", "STATUS", "TIER", "SEVERITY", "PRIORITY", "DUE", "TITLE"],
        rows,
    );
    let p = &page.pagination;
    println!(
        "\npage {} of {} ({} tickets)",
        p.current_page,
        p.total_pages.max(1),
        p.total_items
    );
    Ok(())
}

fn format_due(due: Option<DateTime<Utc>>) -> String {
    due.map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn show(root: &Path, id: &str, json: bool) -> anyhow::Result<()> {
    let ticket = super::open_store(root)?.get(id)?;
    if json {
        return print_json(&ticket);
    }
    print_ticket(&ticket);

    if !ticket.escalation_history().is_empty() {
        println!("\nEscalations:");
        let rows = ticket
            .escalation_history()
            .iter()
            .map(|e| {
                vec![
                    e.at.format("%Y-%m-%d %H:%M").to_string(),
                    format!("{} → {}", e.from_tier, e.to_tier),
                    e.escalated_by.id.clone(),
                    e.reason.clone(),
                ]
            })
            .collect();
        print_table(&["WHEN", "TIERS", "BY", "REASON"], rows);
    }

    println!("\nActivity:");
    let rows = ticket
        .activity_log()
        .iter()
        .map(|a| {
            vec![
                a.timestamp.format("%Y-%m-%d %H:%M").to_string(),
                format!("{} ({})", a.actor.id, a.actor.role),
                a.action.to_string(),
                a.detail.clone(),
            ]
        })
        .collect();
    print_table(&["WHEN", "BY", "ACTION", "DETAIL"], rows);
    Ok(())
}

fn print_ticket(ticket: &Ticket) {
    let mut fields = vec![
        ("id", ticket.id().to_string()),
        ("title", ticket.title().to_string()),
        ("status", ticket.status().to_string()),
        ("tier", ticket.current_tier().to_string()),
        ("severity", severity_label(ticket.severity()).to_string()),
        ("priority", ticket.priority().to_string()),
        ("category", ticket.category().to_string()),
        ("due", format_due(ticket.due_date())),
    ];
    if ticket.is_frozen(Utc::now()) {
        fields.push(("frozen", "past due date, no further changes".to_string()));
    }
    if let Some(resolution) = ticket.resolution() {
        fields.push(("resolution", resolution.to_string()));
    }
    print_fields(&fields);
    println!("\n{}", ticket.description());
}

// ---------------------------------------------------------------------------
// policy
// ---------------------------------------------------------------------------

fn policy(root: &Path, identity: &Identity, id: &str, json: bool) -> anyhow::Result<()> {
    let actor = identity.resolve()?;
    let session = TicketSession::open(super::open_store(root)?, actor, id)?;
    let decision = session.decision(Utc::now());
    if json {
        return print_json(&decision);
    }
    print_decision(&session.ticket(), &decision);
    Ok(())
}

fn yes_no(b: bool) -> String {
    if b { "yes" } else { "no" }.to_string()
}

fn print_decision(ticket: &Ticket, d: &PolicyDecision) {
    println!(
        "{} [{} at {}, {}]",
        ticket.id(),
        ticket.status(),
        ticket.current_tier(),
        severity_label(ticket.severity())
    );
    if d.frozen {
        println!("Ticket is past its due date; no actions are available.");
        return;
    }
    let escalate = match d.escalation_target {
        Some(target) if d.can_escalate => format!("yes (to {target})"),
        _ => yes_no(false),
    };
    let targets: Vec<String> = d.status_targets.iter().map(|s| s.to_string()).collect();
    let offered: Vec<String> = d.offered.iter().map(|a| a.to_string()).collect();
    print_fields(&[
        ("start work", yes_no(d.can_start_work)),
        ("set severity", yes_no(d.can_set_severity)),
        ("escalate", escalate),
        ("resolve", yes_no(d.can_resolve)),
        ("close", yes_no(d.can_close)),
        ("add note", yes_no(d.can_add_note)),
        ("status targets", display_list(&targets)),
        ("actions", display_list(&offered)),
    ]);
}

fn display_list(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

// ---------------------------------------------------------------------------
// transitions
// ---------------------------------------------------------------------------

fn transition(
    root: &Path,
    identity: &Identity,
    id: &str,
    transition: Transition,
    json: bool,
) -> anyhow::Result<()> {
    let actor = identity.resolve()?;
    let session = TicketSession::open(super::open_store(root)?, actor, id)?;
    let ticket = session
        .request(&transition, Utc::now())
        .with_context(|| format!("{transition} on {id} failed"))?;
    if json {
        return print_json(&ticket);
    }
    println!(
        "{}: {} at {} ({})",
        ticket.id(),
        ticket.status(),
        ticket.current_tier(),
        severity_label(ticket.severity())
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn due_date_accepts_plain_date_as_end_of_day() {
        let due = parse_due_date("2030-01-15").unwrap();
        assert_eq!((due.year(), due.month(), due.day()), (2030, 1, 15));
        assert_eq!((due.hour(), due.minute(), due.second()), (23, 59, 59));
    }

    #[test]
    fn due_date_accepts_rfc3339_with_offset() {
        let due = parse_due_date("2030-01-15T10:00:00+02:00").unwrap();
        assert_eq!(due.hour(), 8);
    }

    #[test]
    fn due_date_rejects_garbage() {
        assert!(parse_due_date("next tuesday").is_err());
    }

    #[test]
    fn missing_due_renders_dash() {
        assert_eq!(format_due(None), "-");
    }
}
