use axum::{extract::State, Json};
use helpdesk_core::store::TicketStore;

use super::envelope;
use crate::error::AppError;
use crate::state::AppState;

/// GET /api/stats: dashboard counters
pub async fn get_stats(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let store = app.store.clone();
    let stats = tokio::task::spawn_blocking(move || store.stats())
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    envelope("Stats retrieved", stats)
}
