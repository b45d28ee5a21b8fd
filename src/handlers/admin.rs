use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::error::AppError;
use crate::metrics::{LOGIN_FAILURES_TOTAL, SESSIONS_ISSUED_TOTAL};
use crate::session::SessionClaims;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub identity: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: i64,
}

// login handler - credential check, then a fresh session token.
// Wrong identity and wrong password get the same 401.
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    if !state
        .credentials
        .verify_login(&payload.identity, &payload.password)
        .await
    {
        LOGIN_FAILURES_TOTAL.inc();
        return Err(AppError::Unauthorized);
    }

    let issued = state
        .sessions
        .issue(&payload.identity)
        .map_err(|e| AppError::InternalError(Box::new(e)))?;
    SESSIONS_ISSUED_TOTAL.inc();
    info!("admin session issued");

    Ok(Json(LoginResponse {
        token: issued.token,
        expires_at: issued.expires_at,
    }))
}

// claims were verified by the require_session middleware
pub async fn session_handler(Extension(claims): Extension<SessionClaims>) -> impl IntoResponse {
    Json(serde_json::json!({
        "identity": claims.sub,
        "expires_at": claims.exp,
    }))
}

// sessions are stateless - logout is the client dropping its token
pub async fn logout_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}
