use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;

use crate::error::AppError;
use crate::metrics::{RATE_LIMITED_TOTAL, RATE_LIMIT_KEYS, REQUEST_TOTAL};
use crate::rate_limit::{RateLimitProfile, client_ip, profiles};
use crate::state::AppState;

// Per-route-class throttles. Each wraps the shared enforcement with its
// own profile and key prefix.

pub async fn login_rate_limit(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    enforce(&state, "login", &profiles::LOGIN, req, next).await
}

pub async fn admin_rate_limit(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    enforce(&state, "admin", &profiles::ADMIN, req, next).await
}

pub async fn public_rate_limit(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    enforce(&state, "api", &profiles::PUBLIC_API, req, next).await
}

async fn enforce(
    state: &AppState,
    class: &str,
    profile: &RateLimitProfile,
    req: Request,
    next: Next,
) -> Response {
    REQUEST_TOTAL.inc();

    let ip = client_ip(req.headers());
    let key = format!("{class}:{ip}");
    let decision = state.limiter.check(&key, profile);
    RATE_LIMIT_KEYS.set(state.limiter.tracked_keys() as f64);

    if !decision.allowed {
        RATE_LIMITED_TOTAL.inc();
        debug!(key, retry_after = decision.retry_after_secs, "rate limited");

        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests. Try again later.",
        )
            .into_response();
        let headers = response.headers_mut();
        headers.insert("retry-after", HeaderValue::from(decision.retry_after_secs));
        headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit));
        headers.insert("x-ratelimit-remaining", HeaderValue::from(0u32));
        headers.insert("x-ratelimit-reset", HeaderValue::from(decision.reset_at_ms));
        return response;
    }

    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    response
}

// Session guard for admin routes. Verified claims are stashed as a request
// extension for the handler; every failure collapses to the same 401.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let claims = bearer_token(&req).and_then(|token| state.sessions.verify(token));

    match claims {
        Some(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        None => AppError::Unauthorized.into_response(),
    }
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
