use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use helpdesk_core::store::http::{ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};
use helpdesk_core::types::Role;
use helpdesk_core::Actor;

use crate::error::AppError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Bearer token gate
// ---------------------------------------------------------------------------

/// Middleware that requires `Authorization: Bearer <token>` when the server
/// was started with a token.
///
/// 1. No token configured → passthrough
/// 2. `/api/health` → passthrough (liveness probes)
/// 3. Bearer token matches → passthrough
/// 4. Otherwise → 401 failure envelope
pub async fn auth_middleware(State(app): State<AppState>, req: Request, next: Next) -> Response {
    let Some(token) = app.token.as_deref() else {
        return next.run(req).await;
    };
    if req.uri().path() == "/api/health" {
        return next.run(req).await;
    }
    let presented = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if presented == Some(token) {
        return next.run(req).await;
    }
    AppError::unauthorized("unauthorized").into_response()
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The caller, taken from the `x-actor-id` / `x-actor-role` headers set by
/// the identity layer in front of this server.
pub struct Identity(pub Actor);

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header(parts, ACTOR_ID_HEADER)
            .ok_or_else(|| AppError::unauthorized(format!("missing {ACTOR_ID_HEADER} header")))?;
        let role = header(parts, ACTOR_ROLE_HEADER)
            .ok_or_else(|| AppError::unauthorized(format!("missing {ACTOR_ROLE_HEADER} header")))?
            .parse::<Role>()
            .map_err(|e| AppError::unauthorized(e.to_string()))?;
        Ok(Identity(Actor::new(id, role)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
