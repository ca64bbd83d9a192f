//! HTTP routes.
//!
//! Each module exposes `router()`; capabilities are attached per route group
//! with [`require_capability`](crate::middleware::require_capability).

use axum::middleware;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::middleware::require_auth;
use crate::AppState;

pub mod auth;
pub mod health;
pub mod issuances;
pub mod orders;
pub mod stock;
pub mod users;

/// Build a router with all routes registered (no middleware, no state)
pub fn build_router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(orders::router())
        .merge(issuances::router())
        .merge(stock::router())
        .merge(users::router())
        .merge(health::router())
}

/// Build the application with authentication, tracing and state.
pub fn build_app(state: AppState) -> Router {
    build_router()
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
