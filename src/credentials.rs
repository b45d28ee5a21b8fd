use sha2::{Digest, Sha256};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

// Uniform delay applied to every failed login before returning. Both the
// unknown-identity and wrong-password paths take it, so their latency is
// indistinguishable to a caller probing for valid identities.
pub const LOGIN_FAILURE_DELAY: Duration = Duration::from_millis(100);

#[derive(Error, Debug)]
pub enum CredentialsError {
    #[error("admin password hash is not valid hex: {0}")]
    BadHex(#[from] hex::FromHexError),
    #[error("admin password hash must be a 32-byte sha256 digest, got {0} bytes")]
    BadLength(usize),
}

/// The single configured admin identity and its pre-computed password digest.
/// Loaded once from process configuration; never mutated at runtime.
pub struct AdminCredentials {
    identity: String,
    password_digest: [u8; 32],
    failure_delay: Duration,
}

impl AdminCredentials {
    pub fn new(identity: &str, password_sha256_hex: &str) -> Result<Self, CredentialsError> {
        let decoded = hex::decode(password_sha256_hex.trim())?;
        let password_digest: [u8; 32] = decoded
            .try_into()
            .map_err(|v: Vec<u8>| CredentialsError::BadLength(v.len()))?;

        Ok(Self {
            identity: identity.to_string(),
            password_digest,
            failure_delay: LOGIN_FAILURE_DELAY,
        })
    }

    // tests shorten the delay to keep them fast
    pub fn with_failure_delay(mut self, delay: Duration) -> Self {
        self.failure_delay = delay;
        self
    }

    /// Compare `(identity, password)` against the configured pair.
    ///
    /// The password is hashed and compared digest-to-digest regardless of
    /// whether the identity matched, and every failure path sleeps for the
    /// same delay before returning.
    pub async fn verify_login(&self, identity: &str, password: &str) -> bool {
        let supplied = Sha256::digest(password.as_bytes());

        let digest_ok = constant_time_eq(&supplied, &self.password_digest);
        let identity_ok = identity == self.identity;

        if identity_ok && digest_ok {
            return true;
        }

        debug!(identity_matched = identity_ok, "admin login failed");
        tokio::time::sleep(self.failure_delay).await;
        false
    }
}

// fixed-length digest comparison without data-dependent early exit
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
