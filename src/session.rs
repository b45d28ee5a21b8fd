use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::clock::Clock;

// Sessions live for 2 hours. There is no revocation - the short expiry
// bounds the exposure window instead.
pub const SESSION_TTL_HOURS: i64 = 2;

/// Claims carried by an admin session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Authenticated identity (the single configured admin)
    pub sub: String,
    /// Issued at, unix seconds
    pub iat: i64,
    /// Expires at, unix seconds
    pub exp: i64,
}

pub struct IssuedToken {
    pub token: String,
    pub expires_at: i64,
}

/// Issues and verifies signed, time-bound session tokens for the single
/// admin identity. Stateless: no session table, nothing stored server-side.
pub struct SessionAuthority {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl SessionAuthority {
    pub fn new(secret: &str, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // expiry is enforced by the explicit claims check in verify(), driven
        // by the injected clock, not by the library's own wall-clock check
        validation.validate_exp = false;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            clock,
        }
    }

    /// Sign a token for `identity` expiring `SESSION_TTL_HOURS` from now.
    /// Assumes the caller has already verified credentials.
    pub fn issue(&self, identity: &str) -> Result<IssuedToken, jsonwebtoken::errors::Error> {
        let now = (self.clock.now_unix_ms() / 1000) as i64;
        let claims = SessionClaims {
            sub: identity.to_string(),
            iat: now,
            exp: now + SESSION_TTL_HOURS * 3600,
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok(IssuedToken {
            token,
            expires_at: claims.exp,
        })
    }

    /// Verify signature, then check the embedded expiry against the clock.
    ///
    /// Malformed, forged, and expired tokens all collapse to `None` so callers
    /// cannot leak which case occurred; the cause is only logged at debug level.
    pub fn verify(&self, token: &str) -> Option<SessionClaims> {
        let data = match decode::<SessionClaims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => data,
            Err(e) => {
                debug!(error = %e, "session token rejected: signature/shape check failed");
                return None;
            }
        };

        let now = (self.clock.now_unix_ms() / 1000) as i64;
        if data.claims.exp < now {
            debug!(expired_at = data.claims.exp, "session token rejected: expired");
            return None;
        }

        Some(data.claims)
    }
}
