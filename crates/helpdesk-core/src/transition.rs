//! Lifecycle transitions.
//!
//! [`authorize`] checks a requested [`Transition`] against the policy engine;
//! [`apply`] authorizes it and builds the successor snapshot. Both the file
//! store and the server go through `apply`, so every write is checked by the
//! same rules the UI uses to render its buttons.

use crate::error::{HelpdeskError, Result};
use crate::paths;
use crate::policy::{self, EvalContext};
use crate::ticket::{ActivityAction, ActivityEntry, Actor, EscalationRecord, NewTicket, Ticket};
use crate::types::{severity_label, Role, Severity, TicketStatus};
use chrono::{DateTime, Utc};
use std::fmt;
use tracing::debug;

// ---------------------------------------------------------------------------
// Transition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// New/Escalated → Attending.
    StartWork,
    SetSeverity(Severity),
    /// Hand the ticket to the next tier. Status is left as is.
    Escalate { reason: String },
    /// → Completed.
    Complete,
    UpdateStatus(TicketStatus),
    /// Completed → Resolved, recording how the ticket was resolved.
    Close { resolution: String },
    AddNote { action: String, details: String },
}

impl Transition {
    pub fn name(&self) -> &'static str {
        match self {
            Transition::StartWork => "start_work",
            Transition::SetSeverity(_) => "set_severity",
            Transition::Escalate { .. } => "escalate",
            Transition::Complete => "complete",
            Transition::UpdateStatus(_) => "update_status",
            Transition::Close { .. } => "close",
            Transition::AddNote { .. } => "add_note",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::SetSeverity(sev) => write!(f, "set_severity({sev})"),
            Transition::UpdateStatus(status) => write!(f, "update_status({status})"),
            other => f.write_str(other.name()),
        }
    }
}

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

fn refuse(transition: &Transition, reason: impl Into<String>) -> HelpdeskError {
    HelpdeskError::IllegalTransition {
        transition: transition.to_string(),
        reason: reason.into(),
    }
}

fn require_text(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(HelpdeskError::InvalidTicket(format!("{what} is required")));
    }
    Ok(())
}

/// Generic explanation used when a capability check fails.
fn denial(ctx: &EvalContext) -> String {
    let role = ctx.actor.role;
    let tier = ctx.ticket.current_tier();
    if !policy::tier_authorized(role, tier, ctx.ticket.severity()) {
        return format!(
            "{role} cannot act on {tier} tickets with severity {}",
            severity_label(ctx.ticket.severity())
        );
    }
    format!("not allowed while ticket is {}", ctx.ticket.status())
}

/// Check `transition` against the policy for `actor` at `now`.
pub fn authorize(
    actor: &Actor,
    ticket: &Ticket,
    transition: &Transition,
    now: DateTime<Utc>,
) -> Result<()> {
    let ctx = EvalContext::new(actor, ticket, now);
    if ticket.is_frozen(now) {
        return Err(refuse(transition, "ticket is past its due date"));
    }

    let allowed = match transition {
        Transition::StartWork => policy::can_start_work(&ctx),
        Transition::SetSeverity(_) => {
            if !policy::can_set_severity(&ctx) {
                return Err(refuse(
                    transition,
                    "severity can only be set by L2 on an open L2 ticket",
                ));
            }
            true
        }
        Transition::Escalate { reason } => {
            require_text(reason, "escalation reason")?;
            if !policy::can_escalate(&ctx) {
                let why = match (actor.role, ticket.severity()) {
                    (Role::L3, _) => "L3 is the top tier".to_string(),
                    (Role::L2, sev) if !sev.is_some_and(Severity::is_escalation_grade) => {
                        "L2 may only escalate C1 or C2 tickets".to_string()
                    }
                    _ => denial(&ctx),
                };
                return Err(refuse(transition, why));
            }
            true
        }
        Transition::Complete => policy::can_resolve(&ctx) && !ticket.status().is_closed(),
        Transition::UpdateStatus(target) => {
            if ticket.status() == TicketStatus::Resolved {
                return Err(refuse(transition, "resolved tickets are final"));
            }
            if *target == TicketStatus::Resolved {
                return Err(refuse(
                    transition,
                    "tickets are resolved through close, with a resolution",
                ));
            }
            if *target == ticket.status() {
                return Err(refuse(transition, format!("ticket is already {target}")));
            }
            policy::can_write_status(&ctx, *target)
        }
        Transition::Close { resolution } => {
            require_text(resolution, "resolution")?;
            if ticket.status() != TicketStatus::Completed {
                return Err(refuse(transition, "only Completed tickets can be resolved"));
            }
            policy::can_close(&ctx)
        }
        Transition::AddNote { details, .. } => {
            require_text(details, "note details")?;
            policy::can_add_note(&ctx)
        }
    };

    if allowed {
        Ok(())
    } else {
        Err(refuse(transition, denial(&ctx)))
    }
}

// ---------------------------------------------------------------------------
// Apply
// ---------------------------------------------------------------------------

/// Authorize `transition` and return the successor snapshot.
///
/// The successor differs from `ticket` only in the fields the transition
/// touches, `updatedAt = now`, and exactly one new activity entry.
pub fn apply(
    actor: &Actor,
    ticket: &Ticket,
    transition: &Transition,
    now: DateTime<Utc>,
) -> Result<Ticket> {
    if let Err(e) = authorize(actor, ticket, transition, now) {
        debug!(ticket = %ticket.id(), actor = %actor.id, %transition, error = %e, "transition refused");
        return Err(e);
    }

    let mut next = ticket.clone();
    let (action, detail) = match transition {
        Transition::StartWork => change_status(&mut next, TicketStatus::Attending),
        Transition::Complete => change_status(&mut next, TicketStatus::Completed),
        Transition::UpdateStatus(target) => change_status(&mut next, *target),
        Transition::SetSeverity(sev) => {
            next.severity = Some(*sev);
            (
                ActivityAction::SeverityChanged,
                format!(
                    "Severity changed from {} to {}",
                    severity_label(ticket.severity()),
                    sev.label()
                ),
            )
        }
        Transition::Escalate { reason } => {
            // authorize() guarantees a target exists.
            let ctx = EvalContext::new(actor, ticket, now);
            let target = policy::escalation_target(&ctx)
                .ok_or_else(|| refuse(transition, denial(&ctx)))?;
            next.current_tier = target;
            next.escalation_history.push(EscalationRecord {
                from_tier: ticket.current_tier(),
                to_tier: target,
                reason: reason.trim().to_string(),
                escalated_by: actor.clone(),
                at: now,
            });
            (
                ActivityAction::Escalated,
                format!(
                    "Escalated from {} to {target}: {}",
                    ticket.current_tier(),
                    reason.trim()
                ),
            )
        }
        Transition::Close { resolution } => {
            next.status = TicketStatus::Resolved;
            next.resolution = Some(resolution.trim().to_string());
            (
                ActivityAction::Resolved,
                format!("Resolved: {}", resolution.trim()),
            )
        }
        Transition::AddNote { action, details } => {
            let detail = if action.trim().is_empty() {
                details.trim().to_string()
            } else {
                format!("{}: {}", action.trim(), details.trim())
            };
            (ActivityAction::Note, detail)
        }
    };

    next.updated_at = Some(now);
    next.activity_log.push(ActivityEntry {
        actor: actor.clone(),
        action,
        detail,
        timestamp: now,
    });

    debug!(
        ticket = %next.id(),
        actor = %actor.id,
        %transition,
        status = %next.status(),
        tier = %next.current_tier(),
        "transition applied"
    );
    Ok(next)
}

fn change_status(next: &mut Ticket, to: TicketStatus) -> (ActivityAction, String) {
    let from = next.status;
    next.status = to;
    (
        ActivityAction::StatusChanged,
        format!("Status changed from {from} to {to}"),
    )
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

/// Ticket intake is open to front-line agents and administrators.
pub fn authorize_create(actor: &Actor) -> Result<()> {
    match actor.role {
        Role::L1 | Role::Admin => Ok(()),
        other => Err(HelpdeskError::IllegalTransition {
            transition: "create".to_string(),
            reason: format!("{other} cannot open tickets"),
        }),
    }
}

/// Validate the form and open a ticket under `id`.
pub fn create(actor: &Actor, id: &str, new: NewTicket, now: DateTime<Utc>) -> Result<Ticket> {
    authorize_create(actor)?;
    paths::validate_ticket_id(id)?;
    new.validate(now)?;
    let ticket = Ticket::open(id, new, actor, now);
    debug!(ticket = %ticket.id(), actor = %actor.id, "ticket opened");
    Ok(ticket)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, Priority, Tier};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    fn form() -> NewTicket {
        NewTicket {
            title: "Laptop will not boot".into(),
            description: "Black screen after the vendor logo".into(),
            category: Category::HardwareIssue,
            priority: Priority::High,
            due_date: now() + Duration::days(2),
        }
    }

    fn l1() -> Actor {
        Actor::new("alice", Role::L1)
    }

    fn l2() -> Actor {
        Actor::new("bo", Role::L2)
    }

    fn fresh() -> Ticket {
        create(&l1(), "TCK-00000001", form(), now() - Duration::hours(1)).unwrap()
    }

    /// Walk a fresh ticket up to L2 with the given severity.
    fn at_l2(severity: Option<Severity>) -> Ticket {
        let t = apply(
            &l1(),
            &fresh(),
            &Transition::Escalate {
                reason: "needs hardware swap".into(),
            },
            now(),
        )
        .unwrap();
        match severity {
            Some(sev) => apply(&l2(), &t, &Transition::SetSeverity(sev), now()).unwrap(),
            None => t,
        }
    }

    #[test]
    fn start_work_moves_to_attending() {
        let t = fresh();
        let next = apply(&l1(), &t, &Transition::StartWork, now()).unwrap();
        assert_eq!(next.status(), TicketStatus::Attending);
        assert_eq!(next.activity_log().len(), t.activity_log().len() + 1);
        assert_eq!(next.updated_at(), Some(now()));
        // Input snapshot is untouched.
        assert_eq!(t.status(), TicketStatus::New);
    }

    #[test]
    fn escalation_changes_tier_not_status() {
        let t = fresh();
        let next = apply(
            &l1(),
            &t,
            &Transition::Escalate {
                reason: "beyond L1 scope".into(),
            },
            now(),
        )
        .unwrap();
        assert_eq!(next.current_tier(), Tier::L2);
        assert_eq!(next.status(), t.status());
        assert_eq!(next.escalation_history().len(), 1);
        assert_eq!(next.escalation_notes(), Some("beyond L1 scope"));
        let last = next.activity_log().last().unwrap();
        assert_eq!(last.action, ActivityAction::Escalated);
        assert_eq!(next.activity_log().len(), t.activity_log().len() + 1);
    }

    #[test]
    fn severity_update_leaves_status_and_tier() {
        let t = at_l2(None);
        let next = apply(&l2(), &t, &Transition::SetSeverity(Severity::C1), now()).unwrap();
        assert_eq!(next.severity(), Some(Severity::C1));
        assert_eq!(next.status(), t.status());
        assert_eq!(next.current_tier(), t.current_tier());
        assert_eq!(next.activity_log().len(), t.activity_log().len() + 1);
    }

    #[test]
    fn l2_escalation_requires_grade() {
        let c3 = at_l2(Some(Severity::C3));
        let err = apply(
            &l2(),
            &c3,
            &Transition::Escalate {
                reason: "vendor".into(),
            },
            now(),
        )
        .unwrap_err();
        assert!(err.needs_refresh());
        assert!(err.to_string().contains("C1 or C2"), "got {err}");

        let c2 = at_l2(Some(Severity::C2));
        let next = apply(
            &l2(),
            &c2,
            &Transition::Escalate {
                reason: "vendor".into(),
            },
            now(),
        )
        .unwrap();
        assert_eq!(next.current_tier(), Tier::L3);
        assert_eq!(next.escalation_history().len(), 2);
    }

    #[test]
    fn blank_escalation_reason_is_invalid() {
        let err = apply(
            &l1(),
            &fresh(),
            &Transition::Escalate { reason: "  ".into() },
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, HelpdeskError::InvalidTicket(_)));
    }

    #[test]
    fn l1_complete_requires_attending() {
        let t = fresh();
        assert!(authorize(&l1(), &t, &Transition::Complete, now()).is_err());
        let working = apply(&l1(), &t, &Transition::StartWork, now()).unwrap();
        let done = apply(&l1(), &working, &Transition::Complete, now()).unwrap();
        assert_eq!(done.status(), TicketStatus::Completed);
        // Cannot complete twice.
        assert!(authorize(&l1(), &done, &Transition::Complete, now()).is_err());
    }

    #[test]
    fn close_records_resolution() {
        let working = apply(&l1(), &fresh(), &Transition::StartWork, now()).unwrap();
        let attempt = Transition::Close {
            resolution: "Replaced SSD".into(),
        };
        assert!(matches!(
            authorize(&l1(), &working, &attempt, now()),
            Err(HelpdeskError::IllegalTransition { .. })
        ));
        let done = apply(&l1(), &working, &Transition::Complete, now()).unwrap();
        let closed = apply(&l1(), &done, &attempt, now()).unwrap();
        assert_eq!(closed.status(), TicketStatus::Resolved);
        assert_eq!(closed.resolution(), Some("Replaced SSD"));
        assert_eq!(
            closed.activity_log().last().unwrap().action,
            ActivityAction::Resolved
        );
    }

    #[test]
    fn update_status_to_current_is_refused() {
        let t = fresh();
        let err = authorize(&l1(), &t, &Transition::UpdateStatus(TicketStatus::New), now())
            .unwrap_err();
        assert!(err.to_string().contains("already New"));
    }

    #[test]
    fn l1_cannot_write_escalated_status() {
        let t = fresh();
        assert!(authorize(
            &l1(),
            &t,
            &Transition::UpdateStatus(TicketStatus::Escalated),
            now()
        )
        .is_err());
        assert!(authorize(
            &l2(),
            &t,
            &Transition::UpdateStatus(TicketStatus::Escalated),
            now()
        )
        .is_ok());
    }

    #[test]
    fn frozen_ticket_refuses_everything() {
        let t = fresh();
        let late = now() + Duration::days(5);
        let attempts = [
            Transition::StartWork,
            Transition::Escalate {
                reason: "late".into(),
            },
            Transition::Complete,
            Transition::AddNote {
                action: "call".into(),
                details: "left voicemail".into(),
            },
        ];
        for attempt in attempts {
            let err = apply(&l1(), &t, &attempt, late).unwrap_err();
            assert!(err.to_string().contains("past its due date"), "got {err}");
        }
    }

    #[test]
    fn notes_append_one_entry() {
        let t = fresh();
        let next = apply(
            &l1(),
            &t,
            &Transition::AddNote {
                action: "Phone call".into(),
                details: "Asked user to reseat RAM".into(),
            },
            now(),
        )
        .unwrap();
        let last = next.activity_log().last().unwrap();
        assert_eq!(last.action, ActivityAction::Note);
        assert_eq!(last.detail, "Phone call: Asked user to reseat RAM");
        assert_eq!(next.status(), t.status());
    }

    #[test]
    fn admin_cannot_transition_but_can_create() {
        let admin = Actor::new("root", Role::Admin);
        let t = create(&admin, "TCK-00000002", form(), now()).unwrap();
        assert_eq!(t.created_by(), Some("root"));
        assert!(authorize(&admin, &t, &Transition::StartWork, now()).is_err());
    }

    #[test]
    fn only_l1_and_admin_create() {
        for role in [Role::L2, Role::L3] {
            let err = create(&Actor::new("x", role), "TCK-00000003", form(), now()).unwrap_err();
            assert!(matches!(err, HelpdeskError::IllegalTransition { .. }));
        }
        let err = create(&l1(), "../escape", form(), now()).unwrap_err();
        assert!(matches!(err, HelpdeskError::InvalidTicketId(_)));
    }

    #[test]
    fn transition_display() {
        assert_eq!(Transition::StartWork.to_string(), "start_work");
        assert_eq!(
            Transition::SetSeverity(Severity::C2).to_string(),
            "set_severity(C2)"
        );
        assert_eq!(
            Transition::UpdateStatus(TicketStatus::Completed).to_string(),
            "update_status(Completed)"
        );
    }

    fn resolved() -> Ticket {
        let steps = [
            Transition::StartWork,
            Transition::Complete,
            Transition::Close {
                resolution: "Reseated the RAM".into(),
            },
        ];
        steps
            .iter()
            .fold(fresh(), |t, step| apply(&l1(), &t, step, now()).unwrap())
    }

    #[test]
    fn status_write_cannot_skip_to_resolved() {
        let err = apply(
            &l2(),
            &fresh(),
            &Transition::UpdateStatus(TicketStatus::Resolved),
            now(),
        )
        .unwrap_err();
        assert!(err.needs_refresh());
        assert!(err.to_string().contains("close"), "{err}");
    }

    #[test]
    fn resolved_ticket_refuses_status_writes() {
        let done = resolved();
        assert_eq!(done.status(), TicketStatus::Resolved);
        assert_eq!(done.resolution(), Some("Reseated the RAM"));
        for &target in TicketStatus::all() {
            let err = apply(&l2(), &done, &Transition::UpdateStatus(target), now()).unwrap_err();
            assert!(err.to_string().contains("final"), "{target}: {err}");
        }
    }
}
