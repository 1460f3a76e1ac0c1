//! Route configuration.

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/bootstrap", post(handlers::run_bootstrap))
        .route("/notify", post(handlers::receive_notification))
        // Liveness probe (intentionally unauthenticated)
        .route("/healthz", get(handlers::health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
