use std::sync::Arc;

use crate::clock::Clock;
use crate::config::{Args, Secrets};
use crate::credentials::{AdminCredentials, CredentialsError};
use crate::rate_limit::RateLimiter;
use crate::session::SessionAuthority;

// app's shared state
pub struct AppState {
    pub limiter: RateLimiter,
    pub sessions: SessionAuthority,
    pub credentials: AdminCredentials,
}

impl AppState {
    pub fn new(
        args: &Args,
        secrets: Secrets,
        clock: Arc<dyn Clock>,
    ) -> Result<Arc<Self>, CredentialsError> {
        let credentials =
            AdminCredentials::new(&secrets.admin_identity, &secrets.admin_password_sha256)?;

        Ok(Arc::new(Self {
            limiter: RateLimiter::new(clock.clone(), args.no_rate_limit),
            sessions: SessionAuthority::new(&secrets.session_secret, clock),
            credentials,
        }))
    }
}
