/// Database access layer for cloud-service
///
/// Storage is reached through two traits: `FeedStore` for the read-only feed
/// queries and `ContentStore` for writes and lookups outside the feed.
/// `PgStore` implements both over PostgreSQL; `InMemoryStore` backs local
/// runs and tests.
pub mod content_repo;
pub mod feed_repo;
pub mod memory;

pub use memory::InMemoryStore;

use crate::models::{
    Activity, Post, PostRecord, ProfilePost, ProfileUpdate, ToggleOutcome, UserProfile,
};
use crate::services::cursor::FeedCursor;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use uuid::Uuid;

/// Storage backend failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Read queries behind the feed paginator
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// Newest-first posts strictly after `cursor`, at most `limit` rows
    async fn fetch_posts(
        &self,
        cursor: Option<&FeedCursor>,
        limit: i64,
    ) -> StoreResult<Vec<PostRecord>>;

    async fn reply_counts(&self, post_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, i64>>;

    async fn retweet_counts(&self, post_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, i64>>;

    async fn like_counts(&self, post_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, i64>>;

    /// Subset of `post_ids` liked by `viewer`
    async fn liked_by(&self, viewer: &str, post_ids: &[Uuid]) -> StoreResult<HashSet<Uuid>>;

    /// Subset of `post_ids` retweeted by `viewer`
    async fn retweeted_by(&self, viewer: &str, post_ids: &[Uuid]) -> StoreResult<HashSet<Uuid>>;

    /// Newest-first posts created strictly after `since`, at most `limit` rows
    async fn posts_since(&self, since: DateTime<Utc>, limit: i64)
        -> StoreResult<Vec<PostRecord>>;
}

/// Writes and direct lookups
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn create_post(
        &self,
        author_id: &str,
        content: &str,
        parent_id: Option<Uuid>,
    ) -> StoreResult<Post>;

    /// Flip the viewer's like on a post. `NotFound` when the post is absent.
    async fn toggle_like(&self, user_id: &str, post_id: Uuid) -> StoreResult<ToggleOutcome>;

    /// Flip the viewer's retweet on a post. `NotFound` when the post is absent.
    async fn toggle_retweet(&self, user_id: &str, post_id: Uuid) -> StoreResult<ToggleOutcome>;

    /// Add a reply and return the post's new reply count
    async fn add_reply(&self, user_id: &str, post_id: Uuid, content: &str) -> StoreResult<i64>;

    async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> StoreResult<UserProfile>;

    /// Case-insensitive name/username search. An empty query lists everyone.
    async fn search_users(&self, query: &str, limit: i64) -> StoreResult<Vec<UserProfile>>;

    async fn count_posts(&self) -> StoreResult<i64>;

    /// Author of a post, `None` when the post does not exist
    async fn post_author(&self, post_id: Uuid) -> StoreResult<Option<String>>;

    /// Delete a post along with its likes, retweets and replies
    async fn delete_post(&self, post_id: Uuid) -> StoreResult<()>;

    /// Delete a user, their likes, retweets and replies, and every post they
    /// wrote (with the engagement on those posts)
    async fn delete_user(&self, user_id: &str) -> StoreResult<()>;

    async fn get_profile(&self, user_id: &str) -> StoreResult<Option<UserProfile>>;

    /// The author's posts, newest first, with like counts
    async fn posts_by_author(&self, author_id: &str, limit: i64) -> StoreResult<Vec<ProfilePost>>;

    /// Likes on the user's posts and likes the user gave, newest first,
    /// at most `limit` of each
    async fn activity(&self, user_id: &str, limit: i64) -> StoreResult<Activity>;
}

/// PostgreSQL implementation of both store traits
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}
