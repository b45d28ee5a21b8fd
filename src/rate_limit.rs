use axum::http::HeaderMap;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::clock::Clock;

// Rate limit entry - tracks requests per key within the current window
pub struct RateLimitEntry {
    pub count: u32,
    pub reset_at_ms: u64,
}

// Named policy: window size + request cap. Immutable, selected per route class.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitProfile {
    pub window: Duration,
    pub max_requests: u32,
}

pub mod profiles {
    use super::RateLimitProfile;
    use std::time::Duration;

    // 5 attempts per 15 minutes
    pub const LOGIN: RateLimitProfile = RateLimitProfile {
        window: Duration::from_secs(15 * 60),
        max_requests: 5,
    };

    // 30 requests per minute
    pub const ADMIN: RateLimitProfile = RateLimitProfile {
        window: Duration::from_secs(60),
        max_requests: 30,
    };

    // 60 requests per minute
    pub const PUBLIC_API: RateLimitProfile = RateLimitProfile {
        window: Duration::from_secs(60),
        max_requests: 60,
    };

    // 10 inquiries per hour
    pub const INQUIRY: RateLimitProfile = RateLimitProfile {
        window: Duration::from_secs(60 * 60),
        max_requests: 10,
    };

    // effectively unbounded, used when throttling is explicitly disabled
    pub const UNLIMITED: RateLimitProfile = RateLimitProfile {
        window: Duration::from_secs(60 * 60),
        max_requests: 1_000_000,
    };
}

/// Outcome of a rate limit check. Rejection is a value, never an error.
#[derive(Debug, Clone)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at_ms: u64,
    pub retry_after_secs: u64,
}

/// Fixed-window counter keyed by arbitrary strings (convention: `"<class>:<ip>"`).
///
/// Each key gets its own window, started on first use. Expired entries are
/// replaced lazily on access; keys that go idle are purged by [`sweep_expired`]
/// running on a background interval. State is per-process: under horizontal
/// scaling the effective limits multiply by the number of processes.
///
/// [`sweep_expired`]: RateLimiter::sweep_expired
pub struct RateLimiter {
    entries: DashMap<String, RateLimitEntry>,
    clock: Arc<dyn Clock>,
    disabled: bool,
}

impl RateLimiter {
    pub fn new(clock: Arc<dyn Clock>, disabled: bool) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
            disabled,
        }
    }

    /// Count one request against `key` and decide admit/reject.
    ///
    /// A missing or expired entry starts a fresh window with `count = 1`, so a
    /// cleared store fails open per key rather than rejecting traffic.
    pub fn check(&self, key: &str, profile: &RateLimitProfile) -> RateLimitDecision {
        let profile = if self.disabled {
            &profiles::UNLIMITED
        } else {
            profile
        };

        let now = self.clock.now_unix_ms();
        let window_ms = profile.window.as_millis() as u64;

        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert(RateLimitEntry {
                count: 0,
                reset_at_ms: now + window_ms,
            });

        // window expired..? Start a fresh one
        if entry.reset_at_ms <= now {
            entry.count = 1;
            entry.reset_at_ms = now + window_ms;
        } else {
            entry.count += 1;
        }

        let allowed = entry.count <= profile.max_requests;
        let remaining = profile.max_requests.saturating_sub(entry.count);
        let reset_at_ms = entry.reset_at_ms;
        drop(entry);

        RateLimitDecision {
            allowed,
            limit: profile.max_requests,
            remaining,
            reset_at_ms,
            retry_after_secs: reset_at_ms.saturating_sub(now).div_ceil(1000),
        }
    }

    /// Delete every entry whose window has already ended. Returns the number
    /// of purged entries. Lazy replacement in `check` only covers keys that
    /// keep getting traffic; this sweep is what reclaims idle keys.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now_unix_ms();
        // counted inside the closure: checks running concurrently insert new
        // keys mid-sweep, so before/after length arithmetic is unreliable
        let mut purged = 0;
        self.entries.retain(|_, entry| {
            if entry.reset_at_ms > now {
                true
            } else {
                purged += 1;
                false
            }
        });
        if purged > 0 {
            debug!(purged, "purged expired rate limit entries");
        }
        purged
    }

    pub fn tracked_keys(&self) -> usize {
        self.entries.len()
    }
}

/// Derive the client identity from proxy headers.
///
/// Checked in order: `x-forwarded-for` (first entry), `cf-connecting-ip`,
/// `x-real-ip`, then a fixed fallback. The value is not validated - a forged
/// or missing header degrades to bucket-sharing under the fallback literal,
/// which is accepted for a defensive throttle.
pub fn client_ip(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    for name in ["cf-connecting-ip", "x-real-ip"] {
        if let Some(ip) = headers.get(name).and_then(|v| v.to_str().ok()) {
            if !ip.is_empty() {
                return ip.to_string();
            }
        }
    }

    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn limiter_at(start_ms: u64) -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start_ms));
        (RateLimiter::new(clock.clone(), false), clock)
    }

    #[test]
    fn login_profile_admits_five_then_blocks() {
        let (limiter, _clock) = limiter_at(1_000_000);
        let key = "login:1.2.3.4";

        for expected_remaining in [4, 3, 2, 1, 0] {
            let decision = limiter.check(key, &profiles::LOGIN);
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
            assert_eq!(decision.limit, 5);
        }

        let blocked = limiter.check(key, &profiles::LOGIN);
        assert!(!blocked.allowed);
        assert_eq!(blocked.remaining, 0);
        assert!(blocked.retry_after_secs > 0);
    }

    #[test]
    fn remaining_stays_clamped_at_zero() {
        let (limiter, _clock) = limiter_at(0);
        let key = "login:5.6.7.8";

        for _ in 0..20 {
            limiter.check(key, &profiles::LOGIN);
        }
        let decision = limiter.check(key, &profiles::LOGIN);
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
    }

    #[test]
    fn window_reset_starts_fresh_count() {
        let (limiter, clock) = limiter_at(0);
        let key = "login:1.2.3.4";

        // exhaust the window, plus a pile of rejected calls
        for _ in 0..12 {
            limiter.check(key, &profiles::LOGIN);
        }
        assert!(!limiter.check(key, &profiles::LOGIN).allowed);

        clock.advance(Duration::from_secs(15 * 60 + 1));

        let fresh = limiter.check(key, &profiles::LOGIN);
        assert!(fresh.allowed);
        assert_eq!(fresh.remaining, 4);
    }

    #[test]
    fn reset_time_is_window_start_plus_duration() {
        let (limiter, _clock) = limiter_at(10_000);
        let decision = limiter.check("api:9.9.9.9", &profiles::PUBLIC_API);
        assert_eq!(decision.reset_at_ms, 10_000 + 60_000);
    }

    #[test]
    fn retry_after_rounds_up_to_whole_seconds() {
        let (limiter, clock) = limiter_at(0);
        let key = "login:1.2.3.4";

        limiter.check(key, &profiles::LOGIN);
        // 1.5s before the window ends
        clock.set(15 * 60 * 1000 - 1_500);
        let decision = limiter.check(key, &profiles::LOGIN);
        assert_eq!(decision.retry_after_secs, 2);
    }

    #[test]
    fn sweep_purges_idle_expired_keys() {
        let (limiter, clock) = limiter_at(0);
        limiter.check("login:1.1.1.1", &profiles::LOGIN);
        limiter.check("api:2.2.2.2", &profiles::PUBLIC_API);
        assert_eq!(limiter.tracked_keys(), 2);

        // past the 1min api window but inside the 15min login window
        clock.advance(Duration::from_secs(120));
        assert_eq!(limiter.sweep_expired(), 1);
        assert_eq!(limiter.tracked_keys(), 1);

        // past everything, with zero intervening requests
        clock.advance(Duration::from_secs(15 * 60));
        assert_eq!(limiter.sweep_expired(), 1);
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[test]
    fn sweep_survives_concurrent_inserts() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = Arc::new(RateLimiter::new(clock.clone(), false));

        let writer = {
            let limiter = limiter.clone();
            std::thread::spawn(move || {
                for i in 0..20_000u32 {
                    limiter.check(&format!("api:10.0.{}.{}", i / 256, i % 256), &profiles::PUBLIC_API);
                }
            })
        };

        // keep sweeping while keys pour in; advancing the clock makes each
        // pass purge the previous batch as new inserts land mid-retain
        while !writer.is_finished() {
            clock.advance(Duration::from_secs(61));
            limiter.sweep_expired();
        }
        writer.join().unwrap();

        clock.advance(Duration::from_secs(61));
        limiter.sweep_expired();
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[test]
    fn sweep_on_empty_store_is_a_noop() {
        let (limiter, _clock) = limiter_at(0);
        assert_eq!(limiter.sweep_expired(), 0);
    }

    #[test]
    fn disabled_limiter_never_blocks() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = RateLimiter::new(clock, true);

        for _ in 0..200 {
            assert!(limiter.check("login:1.2.3.4", &profiles::LOGIN).allowed);
        }
    }

    #[test]
    fn keys_are_opaque_so_colliding_callers_share_quota() {
        // the limiter has no namespacing of its own - two callers composing
        // the same key string share one bucket
        let (limiter, _clock) = limiter_at(0);

        for _ in 0..5 {
            limiter.check("shared:1.2.3.4", &profiles::LOGIN);
        }
        assert!(!limiter.check("shared:1.2.3.4", &profiles::LOGIN).allowed);
    }

    #[test]
    fn distinct_keys_count_independently() {
        let (limiter, _clock) = limiter_at(0);

        for _ in 0..5 {
            limiter.check("login:1.2.3.4", &profiles::LOGIN);
        }
        assert!(!limiter.check("login:1.2.3.4", &profiles::LOGIN).allowed);
        assert!(limiter.check("login:5.6.7.8", &profiles::LOGIN).allowed);
    }

    #[test]
    fn client_ip_prefers_forwarded_for_first_entry() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.5, 10.0.0.1".parse().unwrap());
        headers.insert("cf-connecting-ip", "198.51.100.7".parse().unwrap());
        assert_eq!(client_ip(&headers), "203.0.113.5");
    }

    #[test]
    fn client_ip_falls_back_through_header_chain() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "192.0.2.10".parse().unwrap());
        assert_eq!(client_ip(&headers), "192.0.2.10");

        headers.insert("cf-connecting-ip", "198.51.100.7".parse().unwrap());
        assert_eq!(client_ip(&headers), "198.51.100.7");

        assert_eq!(client_ip(&HeaderMap::new()), "unknown");
    }
}
