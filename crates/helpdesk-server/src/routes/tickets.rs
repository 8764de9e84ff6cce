use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use helpdesk_core::policy::{self, EvalContext};
use helpdesk_core::store::wire::{EscalateBody, NoteBody, ResolveBody, SeverityBody, StatusBody};
use helpdesk_core::store::{TicketQuery, TicketStore};
use helpdesk_core::transition::{self, Transition};
use helpdesk_core::types::TicketStatus;
use helpdesk_core::{Actor, NewTicket, Ticket};

use super::envelope;
use crate::auth::Identity;
use crate::error::AppError;
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

/// GET /api/tickets: filtered, paginated list (newest first)
pub async fn list_tickets(
    State(app): State<AppState>,
    ApiQuery(query): ApiQuery<TicketQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = app.store.clone();
    let page = tokio::task::spawn_blocking(move || store.list(&query))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    envelope("Tickets retrieved", page)
}

/// GET /api/tickets/{id}
pub async fn get_ticket(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = app.store.clone();
    let ticket = tokio::task::spawn_blocking(move || store.get(&id))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    envelope("Ticket retrieved", ticket)
}

/// GET /api/tickets/{id}/policy: what the caller may do right now
pub async fn get_policy(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Identity(actor): Identity,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = app.store.clone();
    let ticket = tokio::task::spawn_blocking(move || store.get(&id))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    envelope(
        "Policy evaluated",
        policy::evaluate(&actor, &ticket, Utc::now()),
    )
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// POST /api/tickets
pub async fn create_ticket(
    State(app): State<AppState>,
    Identity(actor): Identity,
    ApiJson(body): ApiJson<NewTicket>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let store = app.store.clone();
    let ticket = tokio::task::spawn_blocking(move || store.create(&actor, body))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    tracing::info!(ticket = %ticket.id(), "ticket created");
    Ok((StatusCode::CREATED, envelope("Ticket created", ticket)?))
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// Fetch the ticket, pick the transition for this request, submit it.
async fn run_transition<F>(
    app: AppState,
    actor: Actor,
    id: String,
    message: &'static str,
    choose: F,
) -> Result<Json<serde_json::Value>, AppError>
where
    F: FnOnce(&Actor, &Ticket, DateTime<Utc>) -> Result<Transition, AppError> + Send + 'static,
{
    let store = app.store.clone();
    let ticket = tokio::task::spawn_blocking(move || {
        let current = store.get(&id)?;
        let transition = choose(&actor, &current, Utc::now())?;
        tracing::info!(ticket = %id, actor = %actor.id, role = %actor.role, %transition, "transition requested");
        Ok::<_, AppError>(store.submit(&actor, &id, &transition)?)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    envelope(message, ticket)
}

/// Map a raw status write onto the most specific transition the actor is
/// allowed to perform.
pub(crate) fn status_transition(
    actor: &Actor,
    ticket: &Ticket,
    target: TicketStatus,
    now: DateTime<Utc>,
) -> Transition {
    let preferred = match (ticket.status(), target) {
        (TicketStatus::New | TicketStatus::Escalated, TicketStatus::Attending) => {
            Some(Transition::StartWork)
        }
        (TicketStatus::Attending, TicketStatus::Completed) => Some(Transition::Complete),
        _ => None,
    };
    match preferred {
        Some(t) if transition::authorize(actor, ticket, &t, now).is_ok() => t,
        _ => Transition::UpdateStatus(target),
    }
}

/// PATCH /api/tickets/{id}/status
pub async fn update_status(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Identity(actor): Identity,
    ApiJson(body): ApiJson<StatusBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    run_transition(app, actor, id, "Status updated", move |actor, ticket, now| {
        Ok(status_transition(actor, ticket, body.status, now))
    })
    .await
}

/// PATCH /api/tickets/{id}/critical-value
pub async fn set_severity(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Identity(actor): Identity,
    ApiJson(body): ApiJson<SeverityBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    run_transition(app, actor, id, "Severity updated", move |_, _, _| {
        Ok(Transition::SetSeverity(body.critical_value))
    })
    .await
}

/// POST /api/tickets/{id}/escalate
pub async fn escalate(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Identity(actor): Identity,
    ApiJson(body): ApiJson<EscalateBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    run_transition(app, actor, id, "Ticket escalated", move |actor, ticket, now| {
        if let Some(requested) = body.to_level {
            let ctx = EvalContext::new(actor, ticket, now);
            if let Some(target) = policy::escalation_target(&ctx) {
                if target != requested {
                    return Err(AppError::unprocessable(format!(
                        "ticket at {} can only be escalated to {target}",
                        ticket.current_tier()
                    )));
                }
            }
        }
        Ok(Transition::Escalate {
            reason: body.full_reason(),
        })
    })
    .await
}

/// POST /api/tickets/{id}/resolve: Completed → Resolved
pub async fn resolve(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Identity(actor): Identity,
    ApiJson(body): ApiJson<ResolveBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    run_transition(app, actor, id, "Ticket resolved", move |_, _, _| {
        Ok(Transition::Close {
            resolution: body.resolution,
        })
    })
    .await
}

/// POST /api/tickets/{id}/action-log
pub async fn add_note(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Identity(actor): Identity,
    ApiJson(body): ApiJson<NoteBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    run_transition(app, actor, id, "Action logged", move |_, _, _| {
        Ok(Transition::AddNote {
            action: body.action,
            details: body.details,
        })
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use helpdesk_core::types::{Category, Priority, Role};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    fn fresh() -> Ticket {
        let form = NewTicket {
            title: "Wi-Fi drops".into(),
            description: "Guest network drops every few minutes".into(),
            category: Category::NetworkProblem,
            priority: Priority::Medium,
            due_date: now() + Duration::days(1),
        };
        transition::create(&Actor::new("a", Role::L1), "TCK-0000BEEF", form, now()).unwrap()
    }

    #[test]
    fn new_to_attending_is_start_work() {
        let t = fresh();
        let actor = Actor::new("a", Role::L1);
        assert_eq!(
            status_transition(&actor, &t, TicketStatus::Attending, now()),
            Transition::StartWork
        );
    }

    #[test]
    fn attending_to_completed_prefers_complete() {
        let actor = Actor::new("a", Role::L1);
        let t = transition::apply(&actor, &fresh(), &Transition::StartWork, now()).unwrap();
        assert_eq!(
            status_transition(&actor, &t, TicketStatus::Completed, now()),
            Transition::Complete
        );
        // L3 cannot resolve an L1 ticket but may still write its status.
        let l3 = Actor::new("c", Role::L3);
        assert_eq!(
            status_transition(&l3, &t, TicketStatus::Completed, now()),
            Transition::UpdateStatus(TicketStatus::Completed)
        );
    }

    #[test]
    fn other_targets_are_plain_updates() {
        let actor = Actor::new("b", Role::L2);
        assert_eq!(
            status_transition(&actor, &fresh(), TicketStatus::Escalated, now()),
            Transition::UpdateStatus(TicketStatus::Escalated)
        );
    }

    #[tokio::test]
    async fn get_missing_ticket_is_404() {
        let dir = tempfile::TempDir::new().unwrap();
        let app = AppState::new(dir.path().to_path_buf());
        let err = get_ticket(State(app), Path("TCK-NOPE".to_string()))
            .await
            .unwrap_err();
        assert!(err.0.to_string().contains("TCK-NOPE"));
    }

    #[tokio::test]
    async fn list_on_empty_workspace_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let app = AppState::new(dir.path().to_path_buf());
        let Json(body) = list_tickets(State(app), ApiQuery(TicketQuery::default()))
            .await
            .unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["pagination"]["totalItems"], 0);
    }
}
