use axum::Json;

/// GET /api/health: liveness probe
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "success": true,
        "message": "ok",
        "data": { "version": env!("CARGO_PKG_VERSION") },
    }))
}
