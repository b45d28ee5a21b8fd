use clap::Parser;
use std::env;
use tracing::warn;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "travel-gateway")]
#[command(about = "Rate limiting and admin session gateway for the travel site backend")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // Rate limit cleanup sweep interval in seconds
    #[arg(long, default_value_t = 60)]
    pub sweep_interval: u64,

    // Disable request throttling (dev/test only)
    #[arg(long, default_value_t = false)]
    pub no_rate_limit: bool,
}

// Secrets come from the environment, not the CLI. Missing values abort
// startup - misconfiguration must never surface per-request.
pub struct Secrets {
    pub admin_identity: String,
    pub admin_password_sha256: String,
    pub session_secret: String,
}

impl Secrets {
    pub fn load() -> Self {
        Self {
            admin_identity: require("ADMIN_IDENTITY"),
            admin_password_sha256: require("ADMIN_PASSWORD_SHA256"),
            session_secret: require("SESSION_SECRET"),
        }
    }
}

fn require(key: &str) -> String {
    env::var(key)
        .map_err(|_| {
            warn!("Environment variable {key} not set");
        })
        .expect("Environment misconfigured!")
}
