/// Shared application state handed to every handler via `web::Data`
use crate::db::{ContentStore, FeedStore, InMemoryStore, PgStore};
use crate::error::{AppError, Result};
use crate::metrics::RATE_LIMIT_DECISIONS;
use crate::services::{FeedPaginator, FeedSettings, ModerationFilter};
use rate_limit::{FixedWindowLimiter, RateLimitDecision, RateLimitPolicy};
use sqlx::PgPool;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Default poll period of `/api/stream`
pub const DEFAULT_STREAM_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct AppState {
    pub feed: FeedPaginator,
    pub content: Arc<dyn ContentStore>,
    pub limiter: Arc<FixedWindowLimiter>,
    pub moderation: ModerationFilter,
    pub rate_limit_enabled: bool,
    pub admins: Arc<HashSet<String>>,
    pub stream_interval: Duration,
}

impl AppState {
    pub fn new(
        feed_store: Arc<dyn FeedStore>,
        content: Arc<dyn ContentStore>,
        limiter: Arc<FixedWindowLimiter>,
        moderation: ModerationFilter,
        feed_settings: FeedSettings,
    ) -> Self {
        Self {
            feed: FeedPaginator::new(feed_store, feed_settings),
            content,
            limiter,
            moderation,
            rate_limit_enabled: true,
            admins: Arc::new(HashSet::new()),
            stream_interval: DEFAULT_STREAM_INTERVAL,
        }
    }

    /// State backed by PostgreSQL
    pub fn with_pg_pool(
        pool: PgPool,
        limiter: Arc<FixedWindowLimiter>,
        moderation: ModerationFilter,
        feed_settings: FeedSettings,
    ) -> Self {
        let store = Arc::new(PgStore::new(pool));
        Self::new(store.clone(), store, limiter, moderation, feed_settings)
    }

    /// State backed by one in-memory store
    pub fn with_memory_store(
        store: Arc<InMemoryStore>,
        limiter: Arc<FixedWindowLimiter>,
        moderation: ModerationFilter,
        feed_settings: FeedSettings,
    ) -> Self {
        Self::new(store.clone(), store, limiter, moderation, feed_settings)
    }

    pub fn with_rate_limiting(mut self, enabled: bool) -> Self {
        self.rate_limit_enabled = enabled;
        self
    }

    pub fn with_admins<I, S>(mut self, admins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.admins = Arc::new(admins.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_stream_interval(mut self, interval: Duration) -> Self {
        self.stream_interval = interval;
        self
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admins.contains(user_id)
    }

    /// Allow `actor` to act on a resource owned by `owner`, or on anything
    /// when `actor` is an admin
    pub fn authorize_owner(&self, actor: &str, owner: &str) -> Result<()> {
        if actor == owner || self.is_admin(actor) {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Only the owner or an admin can do that".to_string(),
            ))
        }
    }

    /// Count one request against `policy` for `identifier`.
    ///
    /// Returns the decision so the caller can echo the `X-RateLimit-*`
    /// headers, or `None` when limiting is disabled.
    pub fn enforce(
        &self,
        policy: RateLimitPolicy,
        identifier: &str,
    ) -> Result<Option<RateLimitDecision>> {
        if !self.rate_limit_enabled {
            return Ok(None);
        }

        let decision = self.limiter.check(&policy.key(identifier), &policy.config());
        let outcome = if decision.allowed { "allowed" } else { "rejected" };
        RATE_LIMIT_DECISIONS
            .with_label_values(&[policy.as_str(), outcome])
            .inc();

        if decision.allowed {
            Ok(Some(decision))
        } else {
            warn!(
                policy = %policy,
                identifier = %identifier,
                reset_at = decision.reset_at,
                "Rate limit exceeded"
            );
            Err(AppError::RateLimited(decision))
        }
    }

    /// Reject text matching the banned-term list
    pub fn moderate(&self, text: &str) -> Result<()> {
        if self.moderation.is_blocked(text) {
            return Err(AppError::BadRequest(
                crate::services::moderation::MODERATION_ERROR_MESSAGE.to_string(),
            ));
        }
        Ok(())
    }
}
