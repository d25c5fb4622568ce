//! API module
//!
//! HTTP API endpoints and middleware.

pub mod middleware;
pub mod routes;
mod state;

use axum::Router;
use tower_http::trace::TraceLayer;

pub use routes::create_router;
pub use state::AppState;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", axum::routing::get(health_check))
        .merge(create_router())
        .layer(axum::middleware::from_fn(middleware::logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
