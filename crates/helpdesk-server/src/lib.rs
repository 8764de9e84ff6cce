pub mod auth;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use axum::middleware;
use axum::routing::{get, patch, post};
use axum::Router;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(root: PathBuf) -> Router {
    router_with_state(state::AppState::new(root))
}

pub fn router_with_state(app_state: state::AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(routes::health::health))
        // Tickets
        .route("/api/tickets", get(routes::tickets::list_tickets))
        .route("/api/tickets", post(routes::tickets::create_ticket))
        .route("/api/tickets/{id}", get(routes::tickets::get_ticket))
        .route("/api/tickets/{id}/policy", get(routes::tickets::get_policy))
        .route(
            "/api/tickets/{id}/status",
            patch(routes::tickets::update_status),
        )
        .route(
            "/api/tickets/{id}/critical-value",
            patch(routes::tickets::set_severity),
        )
        .route(
            "/api/tickets/{id}/escalate",
            post(routes::tickets::escalate),
        )
        .route("/api/tickets/{id}/resolve", post(routes::tickets::resolve))
        .route(
            "/api/tickets/{id}/action-log",
            post(routes::tickets::add_note),
        )
        // Dashboard
        .route("/api/stats", get(routes::stats::get_stats))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            auth::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the helpdesk API server.
pub async fn serve(root: PathBuf, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(root, listener).await
}

/// Start the server on a pre-bound listener.
///
/// Lets the caller read the actual port before starting (useful when
/// `port = 0` and the OS picks a free port).
pub async fn serve_on(root: PathBuf, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = build_router(root.clone());

    tracing::info!(root = %root.display(), "helpdesk API listening on http://localhost:{actual_port}");

    axum::serve(listener, app).await?;
    Ok(())
}
