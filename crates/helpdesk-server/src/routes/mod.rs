pub mod health;
pub mod stats;
pub mod tickets;

use axum::Json;
use helpdesk_core::store::wire::Envelope;
use serde::Serialize;

use crate::error::AppError;

/// Wrap `data` in a success envelope.
pub(crate) fn envelope<T: Serialize>(
    message: &str,
    data: T,
) -> Result<Json<serde_json::Value>, AppError> {
    Ok(Json(serde_json::to_value(Envelope::ok(message, data))?))
}
