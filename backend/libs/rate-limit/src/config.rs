use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Limit applied to one identifier: `limit` requests per `window_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum number of requests allowed in the window
    pub limit: u32,
    /// Window length in milliseconds
    pub window_ms: u64,
}

impl RateLimitConfig {
    pub const fn new(limit: u32, window_ms: u64) -> Self {
        Self { limit, window_ms }
    }

    /// 10 per minute, for writes
    pub const fn write() -> Self {
        Self::new(10, 60_000)
    }

    /// 60 per minute, for reads
    pub const fn read() -> Self {
        Self::new(60, 60_000)
    }

    /// 5 per 5 minutes, for auth-related operations
    pub const fn auth() -> Self {
        Self::new(5, 300_000)
    }

    /// 30 per minute
    pub const fn standard() -> Self {
        Self::new(30, 60_000)
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// Named endpoint classes. Each maps to a fixed [`RateLimitConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitPolicy {
    Write,
    Read,
    Auth,
    Standard,
}

impl RateLimitPolicy {
    pub fn config(self) -> RateLimitConfig {
        match self {
            RateLimitPolicy::Write => RateLimitConfig::write(),
            RateLimitPolicy::Read => RateLimitConfig::read(),
            RateLimitPolicy::Auth => RateLimitConfig::auth(),
            RateLimitPolicy::Standard => RateLimitConfig::standard(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RateLimitPolicy::Write => "write",
            RateLimitPolicy::Read => "read",
            RateLimitPolicy::Auth => "auth",
            RateLimitPolicy::Standard => "standard",
        }
    }

    /// Limiter key for `identifier` under this policy. Policies never share
    /// a window, so a user's reads do not consume their write quota.
    pub fn key(self, identifier: &str) -> String {
        format!("{}:{}", self.as_str(), identifier)
    }
}

impl fmt::Display for RateLimitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_configs() {
        assert_eq!(RateLimitConfig::write(), RateLimitConfig::new(10, 60_000));
        assert_eq!(RateLimitConfig::read(), RateLimitConfig::new(60, 60_000));
        assert_eq!(RateLimitConfig::auth(), RateLimitConfig::new(5, 300_000));
        assert_eq!(RateLimitConfig::standard(), RateLimitConfig::new(30, 60_000));
    }

    #[test]
    fn test_default_is_standard() {
        assert_eq!(RateLimitConfig::default(), RateLimitConfig::standard());
    }

    #[test]
    fn test_policy_maps_to_config() {
        assert_eq!(RateLimitPolicy::Write.config().limit, 10);
        assert_eq!(RateLimitPolicy::Read.config().limit, 60);
        assert_eq!(RateLimitPolicy::Auth.config().window(), Duration::from_secs(300));
        assert_eq!(RateLimitPolicy::Standard.config().limit, 30);
    }

    #[test]
    fn test_policy_key_format() {
        assert_eq!(RateLimitPolicy::Write.key("user_123"), "write:user_123");
        assert_eq!(RateLimitPolicy::Read.key("ip:10.0.0.1"), "read:ip:10.0.0.1");
    }

    #[test]
    fn test_policy_deserializes_lowercase() {
        let policy: RateLimitPolicy = serde_json::from_str("\"auth\"").unwrap();
        assert_eq!(policy, RateLimitPolicy::Auth);
    }
}
