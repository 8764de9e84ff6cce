//! Lifecycle policy engine.
//!
//! Pure decisions over an explicit `(actor, ticket, now)` triple. Nothing
//! here reads global state, performs I/O or fails: the same inputs always
//! produce the same [`PolicyDecision`]. The store adapters and the server
//! call into these same functions, so client gating and server enforcement
//! cannot drift apart.

use crate::ticket::{Actor, Ticket};
use crate::types::{Role, Severity, TicketStatus, Tier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// EvalContext
// ---------------------------------------------------------------------------

pub struct EvalContext<'a> {
    pub actor: &'a Actor,
    pub ticket: &'a Ticket,
    pub now: DateTime<Utc>,
}

impl<'a> EvalContext<'a> {
    pub fn new(actor: &'a Actor, ticket: &'a Ticket, now: DateTime<Utc>) -> Self {
        Self { actor, ticket, now }
    }
}

// ---------------------------------------------------------------------------
// Condition helpers
// ---------------------------------------------------------------------------

fn is_frozen(ctx: &EvalContext) -> bool {
    ctx.ticket.is_frozen(ctx.now)
}

fn at_tier(ctx: &EvalContext, tier: Tier) -> bool {
    ctx.ticket.current_tier() == tier
}

fn in_status(ctx: &EvalContext, statuses: &[TicketStatus]) -> bool {
    statuses.contains(&ctx.ticket.status())
}

fn closed(ctx: &EvalContext) -> bool {
    ctx.ticket.status().is_closed()
}

fn escalation_grade(severity: Option<Severity>) -> bool {
    severity.is_some_and(Severity::is_escalation_grade)
}

/// Tier-authorization table: may `role` generally act on a ticket sitting
/// at `tier`?
///
/// | role  | L1  | L2  | L3             |
/// |-------|-----|-----|----------------|
/// | L1    | yes | no  | no             |
/// | L2    | yes | yes | no             |
/// | L3    | yes | yes | only C1 / C2   |
/// | ADMIN | no  | no  | no             |
pub fn tier_authorized(role: Role, tier: Tier, severity: Option<Severity>) -> bool {
    match (role, tier) {
        (Role::L1, Tier::L1) => true,
        (Role::L2, Tier::L1 | Tier::L2) => true,
        (Role::L3, Tier::L1 | Tier::L2) => true,
        (Role::L3, Tier::L3) => escalation_grade(severity),
        _ => false,
    }
}

fn authorized(ctx: &EvalContext) -> bool {
    tier_authorized(
        ctx.actor.role,
        ctx.ticket.current_tier(),
        ctx.ticket.severity(),
    )
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// New/Escalated → Attending.
pub fn can_start_work(ctx: &EvalContext) -> bool {
    !is_frozen(ctx)
        && authorized(ctx)
        && in_status(ctx, &[TicketStatus::New, TicketStatus::Escalated])
}

pub fn can_set_severity(ctx: &EvalContext) -> bool {
    !is_frozen(ctx) && ctx.actor.role == Role::L2 && at_tier(ctx, Tier::L2) && !closed(ctx)
}

/// Tier the actor may escalate the ticket to, if any.
///
/// L2 → L3 requires a C1/C2 classification; L3 is terminal.
pub fn escalation_target(ctx: &EvalContext) -> Option<Tier> {
    if is_frozen(ctx) || closed(ctx) {
        return None;
    }
    let home = ctx.actor.role.tier()?;
    if !at_tier(ctx, home) {
        return None;
    }
    if home == Tier::L2 && !escalation_grade(ctx.ticket.severity()) {
        return None;
    }
    home.next()
}

pub fn can_escalate(ctx: &EvalContext) -> bool {
    escalation_target(ctx).is_some()
}

/// Move to Completed, the resolution signal of the action set.
pub fn can_resolve(ctx: &EvalContext) -> bool {
    if is_frozen(ctx) {
        return false;
    }
    match ctx.actor.role {
        Role::L1 => at_tier(ctx, Tier::L1) && in_status(ctx, &[TicketStatus::Attending]),
        Role::L2 => at_tier(ctx, Tier::L2),
        Role::L3 => at_tier(ctx, Tier::L3) && escalation_grade(ctx.ticket.severity()),
        Role::Admin => false,
    }
}

/// General status-write authorization.
pub fn can_update_status_to(ctx: &EvalContext, target: TicketStatus) -> bool {
    if is_frozen(ctx) || !authorized(ctx) {
        return false;
    }
    match ctx.actor.role {
        Role::L1 => matches!(
            target,
            TicketStatus::New | TicketStatus::Attending | TicketStatus::Completed
        ),
        _ => true,
    }
}

/// Whether a plain status write to `target` may be performed.
///
/// Narrower than [`can_update_status_to`]: `Resolved` is only reached
/// through Close, and a Resolved ticket is final.
pub fn can_write_status(ctx: &EvalContext, target: TicketStatus) -> bool {
    target != TicketStatus::Resolved
        && !in_status(ctx, &[TicketStatus::Resolved])
        && can_update_status_to(ctx, target)
}

/// Completed → Resolved through the resolve collaborator.
pub fn can_close(ctx: &EvalContext) -> bool {
    !is_frozen(ctx) && authorized(ctx) && in_status(ctx, &[TicketStatus::Completed])
}

pub fn can_add_note(ctx: &EvalContext) -> bool {
    !is_frozen(ctx) && authorized(ctx)
}

/// Whether an action region should be rendered at all.
pub fn has_any_action(ctx: &EvalContext) -> bool {
    if is_frozen(ctx) {
        return false;
    }
    let status = ctx.ticket.status();
    can_escalate(ctx)
        || (can_resolve(ctx) && !status.is_closed())
        || (can_start_work(ctx) && status == TicketStatus::New)
        || (can_update_status_to(ctx, TicketStatus::Completed) && status == TicketStatus::Attending)
}

// ---------------------------------------------------------------------------
// Offered actions (display order)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Escalate,
    Resolve,
    StartWork,
    Close,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActionKind::Escalate => "escalate",
            ActionKind::Resolve => "resolve",
            ActionKind::StartWork => "start_work",
            ActionKind::Close => "close",
        };
        f.write_str(s)
    }
}

/// A fn-pointer rule deciding whether one action button is shown.
pub struct ActionRule {
    pub id: &'static str,
    pub action: ActionKind,
    pub condition: fn(&EvalContext) -> bool,
}

static ACTION_RULES: [ActionRule; 4] = [
    ActionRule {
        id: "escalate",
        action: ActionKind::Escalate,
        condition: can_escalate,
    },
    // Escalated tickets have to be picked up before they can be resolved.
    ActionRule {
        id: "resolve",
        action: ActionKind::Resolve,
        condition: |ctx| {
            can_resolve(ctx)
                && !in_status(
                    ctx,
                    &[
                        TicketStatus::Completed,
                        TicketStatus::Resolved,
                        TicketStatus::Escalated,
                    ],
                )
        },
    },
    ActionRule {
        id: "start_work",
        action: ActionKind::StartWork,
        condition: can_start_work,
    },
    ActionRule {
        id: "close",
        action: ActionKind::Close,
        condition: can_close,
    },
];

pub fn action_rules() -> &'static [ActionRule] {
    &ACTION_RULES
}

// ---------------------------------------------------------------------------
// PolicyDecision
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub frozen: bool,
    pub can_start_work: bool,
    pub can_set_severity: bool,
    pub can_escalate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation_target: Option<Tier>,
    pub can_resolve: bool,
    pub can_close: bool,
    pub can_add_note: bool,
    /// Statuses the actor may write directly, in declaration order.
    pub status_targets: Vec<TicketStatus>,
    pub has_any_action: bool,
    /// Buttons to render, in display order.
    pub offered: Vec<ActionKind>,
}

impl PolicyDecision {
    pub fn can_update_status_to(&self, target: TicketStatus) -> bool {
        self.status_targets.contains(&target)
    }

    pub fn offered_actions(&self) -> &[ActionKind] {
        &self.offered
    }

    pub fn offers(&self, action: ActionKind) -> bool {
        self.offered.contains(&action)
    }
}

/// Evaluate every capability for `actor` on `ticket` at `now`.
pub fn evaluate(actor: &Actor, ticket: &Ticket, now: DateTime<Utc>) -> PolicyDecision {
    let ctx = EvalContext::new(actor, ticket, now);
    evaluate_ctx(&ctx)
}

pub fn evaluate_ctx(ctx: &EvalContext) -> PolicyDecision {
    let status_targets = TicketStatus::all()
        .iter()
        .copied()
        .filter(|&s| can_write_status(ctx, s))
        .collect();
    let offered = action_rules()
        .iter()
        .filter(|rule| (rule.condition)(ctx))
        .map(|rule| rule.action)
        .collect();

    PolicyDecision {
        frozen: is_frozen(ctx),
        can_start_work: can_start_work(ctx),
        can_set_severity: can_set_severity(ctx),
        can_escalate: can_escalate(ctx),
        escalation_target: escalation_target(ctx),
        can_resolve: can_resolve(ctx),
        can_close: can_close(ctx),
        can_add_note: can_add_note(ctx),
        status_targets,
        has_any_action: has_any_action(ctx),
        offered,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
