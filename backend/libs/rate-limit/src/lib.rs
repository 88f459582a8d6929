//! # Rate Limit Library
//!
//! Process-local fixed-window rate limiting for Clouds services
//!
//! ## Modules
//! - `clock`: time source abstraction (system clock, manual clock for tests)
//! - `config`: per-endpoint-class limits (`write`, `read`, `auth`, `standard`)
//! - `limiter`: the fixed-window counter map
//! - `sweeper`: background task evicting expired windows
//! - `middleware`: actix middleware applying a policy to a scope
//!
//! Counters live in this process only. Several replicas behind a load
//! balancer each enforce the limit independently, so the effective limit is
//! multiplied by the replica count.

pub mod clock;
pub mod config;
pub mod limiter;
pub mod middleware;
pub mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{RateLimitConfig, RateLimitPolicy};
pub use limiter::{FixedWindowLimiter, RateLimitDecision};
pub use middleware::{insert_rate_limit_headers, too_many_requests, RateLimitMiddleware};
pub use sweeper::RateLimitSweeper;
