/// Data models for cloud-service
///
/// Persistent rows (`Post`, `UserProfile`) map straight onto the SQL schema;
/// the view types (`PostView`, `FeedResponse`) are what the HTTP layer emits.
use crate::services::cursor::FeedCursor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A published cloud (`tweets` table)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub content: String,
    pub author_id: String,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Author summary joined onto a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub username: Option<String>,
    pub name: Option<String>,
    pub image: Option<String>,
}

/// A fetched post together with its author, if the author still exists
#[derive(Debug, Clone)]
pub struct PostRecord {
    pub post: Post,
    pub author: Option<Author>,
}

/// Post enriched with engagement counts and viewer state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: Uuid,
    pub content: String,
    pub author_id: String,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub author: Author,
    pub like_count: i64,
    pub reply_count: i64,
    pub retweet_count: i64,
    pub viewer_has_liked: bool,
    pub viewer_has_retweeted: bool,
}

#[derive(Debug, Clone)]
pub struct FeedPage {
    pub posts: Vec<PostView>,
    pub next_cursor: Option<FeedCursor>,
    pub has_more: bool,
}

/// Wire shape of `GET /api/tweets`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    pub tweets: Vec<PostView>,
    pub next_cursor: Option<String>,
    pub next_cursor_id: Option<Uuid>,
    pub has_more: bool,
}

impl From<FeedPage> for FeedResponse {
    fn from(page: FeedPage) -> Self {
        Self {
            next_cursor: page.next_cursor.map(|c| c.timestamp_string()),
            next_cursor_id: page.next_cursor.and_then(|c| c.id),
            has_more: page.has_more,
            tweets: page.posts,
        }
    }
}

/// Public user profile (`users` table)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: Option<String>,
    pub name: Option<String>,
    pub image: Option<String>,
    pub bio: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Partial profile update; `None` leaves the column untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.bio.is_none() && self.image.is_none()
    }
}

/// Result of flipping a like or retweet edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleOutcome {
    /// Whether the edge exists after the toggle
    pub active: bool,
    /// Edge count for the post after the toggle
    pub count: i64,
}

/// One of a user's own posts with its like count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePost {
    pub id: Uuid,
    pub content: String,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub like_count: i64,
}

/// A like left by someone else on one of the user's posts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LikeReceived {
    pub liked_at: DateTime<Utc>,
    pub tweet_id: Uuid,
    pub tweet_content: String,
    pub liker_id: String,
    pub liker_name: Option<String>,
    pub liker_username: Option<String>,
}

/// A like the user left. `tweet_content` is `None` once the post is gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LikeGiven {
    pub liked_at: DateTime<Utc>,
    pub tweet_id: Uuid,
    pub tweet_content: Option<String>,
}

/// Likes received and given, newest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Activity {
    pub received: Vec<LikeReceived>,
    pub given: Vec<LikeGiven>,
}
