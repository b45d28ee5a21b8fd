use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, register_counter, register_gauge};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("gateway_requests_total", "Total number of requests").unwrap();
    pub static ref RATE_LIMITED_TOTAL: Counter = register_counter!(
        "gateway_rate_limited_total",
        "Requests rejected by the rate limiter"
    )
    .unwrap();
    pub static ref LOGIN_FAILURES_TOTAL: Counter = register_counter!(
        "gateway_login_failures_total",
        "Rejected admin login attempts"
    )
    .unwrap();
    pub static ref SESSIONS_ISSUED_TOTAL: Counter = register_counter!(
        "gateway_sessions_issued_total",
        "Admin session tokens issued"
    )
    .unwrap();
    pub static ref RATE_LIMIT_KEYS: Gauge = register_gauge!(
        "gateway_rate_limit_keys",
        "Current number of tracked rate limit keys"
    )
    .unwrap();
}
