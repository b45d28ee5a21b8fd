mod admin;
mod health;
mod metrics;

pub use admin::{login_handler, logout_handler, session_handler};
pub use health::health_handler;
pub use metrics::metrics_handler;
