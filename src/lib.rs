pub mod clock;
pub mod config;
pub mod credentials;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod rate_limit;
pub mod session;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use handlers::{health_handler, login_handler, logout_handler, metrics_handler, session_handler};
use state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    // login gets its own strict throttle; the rest of the admin surface sits
    // behind the session guard inside the admin throttle
    let login_routes = Router::new()
        .route("/api/admin/login", post(login_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::login_rate_limit,
        ));

    let admin_routes = Router::new()
        .route("/api/admin/session", get(session_handler))
        .route("/api/admin/logout", post(logout_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_session,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::admin_rate_limit,
        ));

    let ops_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::public_rate_limit,
        ));

    Router::new()
        .merge(login_routes)
        .merge(admin_routes)
        .merge(ops_routes)
        .with_state(state)
}
