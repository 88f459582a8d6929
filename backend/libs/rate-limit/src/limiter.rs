use crate::clock::{Clock, SystemClock};
use crate::config::RateLimitConfig;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
struct WindowRecord {
    count: u32,
    window_reset_at: i64,
}

/// Outcome of a single [`FixedWindowLimiter::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// Window end, milliseconds since the unix epoch
    pub reset_at: i64,
    pub limit: u32,
}

impl RateLimitDecision {
    /// Window end in unix seconds, rounded up.
    pub fn reset_at_secs(&self) -> i64 {
        (self.reset_at + 999).div_euclid(1000)
    }

    /// Whole seconds from `now_ms` until the window resets, rounded up, never negative.
    pub fn retry_after_secs(&self, now_ms: i64) -> i64 {
        (self.reset_at.saturating_sub(now_ms) + 999).div_euclid(1000).max(0)
    }

    /// `X-RateLimit-*` header pairs for this decision.
    pub fn headers(&self) -> [(&'static str, String); 3] {
        [
            ("X-RateLimit-Limit", self.limit.to_string()),
            ("X-RateLimit-Remaining", self.remaining.to_string()),
            ("X-RateLimit-Reset", self.reset_at_secs().to_string()),
        ]
    }
}

/// Fixed-window request counter keyed by identifier.
///
/// Records are held in a sharded map; a check locks only the shard holding
/// its key, so the read-increment-compare for one identifier is atomic while
/// unrelated identifiers proceed in parallel.
pub struct FixedWindowLimiter {
    records: DashMap<String, WindowRecord>,
    clock: Arc<dyn Clock>,
}

impl FixedWindowLimiter {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: DashMap::new(),
            clock,
        }
    }

    /// Count one request for `identifier` and decide whether it may proceed.
    ///
    /// The request that crosses the limit is counted and rejected. A full
    /// window stays full until `reset_at`; it is never reset early.
    pub fn check(&self, identifier: &str, config: &RateLimitConfig) -> RateLimitDecision {
        let now = self.clock.now_millis();
        let limit = config.limit;

        let mut record = match self.records.get_mut(identifier) {
            Some(record) => record,
            None => self
                .records
                .entry(identifier.to_owned())
                .or_insert(WindowRecord {
                    count: 0,
                    window_reset_at: now,
                }),
        };

        if record.count == 0 || now > record.window_reset_at {
            let window = i64::try_from(config.window_ms).unwrap_or(i64::MAX);
            *record = WindowRecord {
                count: 1,
                window_reset_at: now.saturating_add(window),
            };
            return RateLimitDecision {
                allowed: true,
                remaining: limit.saturating_sub(1),
                reset_at: record.window_reset_at,
                limit,
            };
        }

        // Saturate at limit + 1 so a hammered key cannot grow without bound.
        if record.count <= limit {
            record.count += 1;
        }

        if record.count > limit {
            RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_at: record.window_reset_at,
                limit,
            }
        } else {
            RateLimitDecision {
                allowed: true,
                remaining: limit - record.count,
                reset_at: record.window_reset_at,
                limit,
            }
        }
    }

    /// Requests counted in the live window for `identifier` (0 if none).
    pub fn request_count(&self, identifier: &str) -> u32 {
        let now = self.clock.now_millis();
        self.records
            .get(identifier)
            .filter(|record| now <= record.window_reset_at)
            .map(|record| record.count)
            .unwrap_or(0)
    }

    /// Drop the window for `identifier`.
    pub fn reset(&self, identifier: &str) -> bool {
        self.records.remove(identifier).is_some()
    }

    /// Remove every record whose window has ended. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let mut removed = 0usize;
        self.records.retain(|_, record| {
            let live = now <= record.window_reset_at;
            if !live {
                removed += 1;
            }
            live
        });
        removed
    }

    /// Number of identifiers currently tracked, expired or not.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }
}

impl Default for FixedWindowLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::time::Duration;

    fn limiter_at(start: i64) -> (Arc<ManualClock>, FixedWindowLimiter) {
        let clock = Arc::new(ManualClock::new(start));
        let limiter = FixedWindowLimiter::with_clock(clock.clone());
        (clock, limiter)
    }

    #[test]
    fn test_first_request_opens_window() {
        let (_clock, limiter) = limiter_at(10_000);
        let config = RateLimitConfig::new(5, 60_000);

        let decision = limiter.check("user_1", &config);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 4);
        assert_eq!(decision.limit, 5);
        assert_eq!(decision.reset_at, 70_000);
    }

    #[test]
    fn test_sixth_request_rejected() {
        let (_clock, limiter) = limiter_at(0);
        let config = RateLimitConfig::new(5, 60_000);

        let remaining: Vec<u32> = (0..5)
            .map(|_| {
                let d = limiter.check("user_1", &config);
                assert!(d.allowed);
                d.remaining
            })
            .collect();
        assert_eq!(remaining, vec![4, 3, 2, 1, 0]);

        let sixth = limiter.check("user_1", &config);
        assert!(!sixth.allowed);
        assert_eq!(sixth.remaining, 0);
    }

    #[test]
    fn test_full_window_does_not_reset_early() {
        let (clock, limiter) = limiter_at(0);
        let config = RateLimitConfig::new(1, 1_000);

        assert!(limiter.check("k", &config).allowed);
        clock.advance(Duration::from_millis(1_000));
        // now == reset_at is still inside the window
        let blocked = limiter.check("k", &config);
        assert!(!blocked.allowed);
        assert_eq!(blocked.reset_at, 1_000);
    }

    #[test]
    fn test_window_resets_after_expiry() {
        let (clock, limiter) = limiter_at(0);
        let config = RateLimitConfig::new(1, 1_000);

        assert!(limiter.check("k", &config).allowed);
        assert!(!limiter.check("k", &config).allowed);

        clock.advance(Duration::from_millis(1_500));
        let fresh = limiter.check("k", &config);
        assert!(fresh.allowed);
        assert_eq!(fresh.remaining, 0);
        assert_eq!(fresh.reset_at, 2_500);
    }

    #[test]
    fn test_count_saturates_at_limit_plus_one() {
        let (_clock, limiter) = limiter_at(0);
        let config = RateLimitConfig::new(3, 60_000);

        for _ in 0..20 {
            limiter.check("busy", &config);
        }
        assert_eq!(limiter.request_count("busy"), 4);
    }

    #[test]
    fn test_identifiers_are_independent() {
        let (_clock, limiter) = limiter_at(0);
        let config = RateLimitConfig::new(1, 60_000);

        assert!(limiter.check("a", &config).allowed);
        assert!(!limiter.check("a", &config).allowed);
        assert!(limiter.check("b", &config).allowed);
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let (clock, limiter) = limiter_at(0);
        limiter.check("short", &RateLimitConfig::new(5, 1_000));
        limiter.check("long", &RateLimitConfig::new(5, 60_000));

        clock.advance(Duration::from_millis(2_000));
        assert_eq!(limiter.sweep_expired(), 1);
        assert_eq!(limiter.len(), 1);
        assert_eq!(limiter.request_count("long"), 1);
        assert_eq!(limiter.request_count("short"), 0);
    }

    #[test]
    fn test_reset_clears_window() {
        let (_clock, limiter) = limiter_at(0);
        let config = RateLimitConfig::new(1, 60_000);
        limiter.check("k", &config);
        assert!(limiter.reset("k"));
        assert!(!limiter.reset("k"));
        assert!(limiter.check("k", &config).allowed);
    }

    #[test]
    fn test_huge_window_does_not_wrap() {
        let (_clock, limiter) = limiter_at(1_000);
        let config = RateLimitConfig::new(1, u64::MAX);

        let first = limiter.check("k", &config);
        assert!(first.allowed);
        assert_eq!(first.reset_at, i64::MAX);
        assert!(!limiter.check("k", &config).allowed);
    }

    #[test]
    fn test_retry_after_rounds_up() {
        let decision = RateLimitDecision {
            allowed: false,
            remaining: 0,
            reset_at: 10_500,
            limit: 1,
        };
        assert_eq!(decision.retry_after_secs(0), 11);
        assert_eq!(decision.retry_after_secs(10_000), 1);
        assert_eq!(decision.retry_after_secs(20_000), 0);
    }

    #[test]
    fn test_reset_header_rounds_up_to_seconds() {
        let decision = RateLimitDecision {
            allowed: false,
            remaining: 0,
            reset_at: 1_700_000_000_001,
            limit: 10,
        };
        assert_eq!(decision.reset_at_secs(), 1_700_000_001);

        let headers = decision.headers();
        assert_eq!(headers[0], ("X-RateLimit-Limit", "10".to_string()));
        assert_eq!(headers[1], ("X-RateLimit-Remaining", "0".to_string()));
        assert_eq!(headers[2], ("X-RateLimit-Reset", "1700000001".to_string()));
    }
}
