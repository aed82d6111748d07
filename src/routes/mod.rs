//! API route handlers.

pub mod admin;
pub mod verify;

use crate::auth::middleware::AppState;
use crate::middleware::security_headers;
use axum::{
    routing::{any, get},
    Router,
};
use tower_http::trace::TraceLayer;

/// Build the API router with all endpoints.
pub fn api_router() -> Router<AppState> {
    Router::new()
        // Forward-auth decision, for whatever method the proxy echoes
        .route("/verify", any(verify::verify))
        .route("/health", get(verify::health))
        // Operator endpoints
        .route(
            "/reload-config",
            get(admin::reload_config).post(admin::reload_config),
        )
}

/// The full application: routes, response hardening and request tracing.
pub fn app(state: AppState) -> Router {
    api_router()
        .layer(axum::middleware::from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
