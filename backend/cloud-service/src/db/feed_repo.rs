/// Feed queries over PostgreSQL
use super::{FeedStore, PgStore, StoreResult};
use crate::models::{Author, Post, PostRecord};
use crate::services::cursor::FeedCursor;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct FeedRow {
    id: Uuid,
    content: String,
    author_id: String,
    parent_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    author_ref: Option<String>,
    author_username: Option<String>,
    author_name: Option<String>,
    author_image: Option<String>,
}

impl From<FeedRow> for PostRecord {
    fn from(row: FeedRow) -> Self {
        let author = row.author_ref.map(|id| Author {
            id,
            username: row.author_username,
            name: row.author_name,
            image: row.author_image,
        });

        PostRecord {
            post: Post {
                id: row.id,
                content: row.content,
                author_id: row.author_id,
                parent_id: row.parent_id,
                created_at: row.created_at,
            },
            author,
        }
    }
}

/// Posts left-joined to their author; orphans come back with a null `author_ref`
const POSTS_WITH_AUTHOR: &str = r#"
    SELECT t.id, t.content, t.author_id, t.parent_id, t.created_at,
           u.id AS author_ref,
           u.username AS author_username,
           u.name AS author_name,
           u.image AS author_image
    FROM tweets t
    LEFT JOIN users u ON u.id = t.author_id
"#;

/// Per-post edge tables
#[derive(Debug, Clone, Copy)]
pub(super) enum EdgeTable {
    Likes,
    Retweets,
    Replies,
}

impl EdgeTable {
    pub(super) fn name(self) -> &'static str {
        match self {
            EdgeTable::Likes => "likes",
            EdgeTable::Retweets => "retweets",
            EdgeTable::Replies => "replies",
        }
    }
}

impl PgStore {
    async fn count_by_post(
        &self,
        table: EdgeTable,
        post_ids: &[Uuid],
    ) -> StoreResult<HashMap<Uuid, i64>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!(
            "SELECT tweet_id, COUNT(*) FROM {} WHERE tweet_id = ANY($1) GROUP BY tweet_id",
            table.name()
        );
        let rows: Vec<(Uuid, i64)> = sqlx::query_as(&sql)
            .bind(post_ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().collect())
    }

    async fn edges_of_user(
        &self,
        table: EdgeTable,
        user_id: &str,
        post_ids: &[Uuid],
    ) -> StoreResult<HashSet<Uuid>> {
        if post_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let sql = format!(
            "SELECT tweet_id FROM {} WHERE user_id = $1 AND tweet_id = ANY($2)",
            table.name()
        );
        let ids: Vec<Uuid> = sqlx::query_scalar(&sql)
            .bind(user_id)
            .bind(post_ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(ids.into_iter().collect())
    }
}

#[async_trait]
impl FeedStore for PgStore {
    async fn fetch_posts(
        &self,
        cursor: Option<&FeedCursor>,
        limit: i64,
    ) -> StoreResult<Vec<PostRecord>> {
        let sql = format!(
            r#"
            {}
            WHERE $1::timestamptz IS NULL
               OR ($2::uuid IS NULL AND t.created_at < $1)
               OR ($2::uuid IS NOT NULL AND (t.created_at, t.id) < ($1, $2))
            ORDER BY t.created_at DESC, t.id DESC
            LIMIT $3
            "#,
            POSTS_WITH_AUTHOR
        );
        let rows = sqlx::query_as::<_, FeedRow>(&sql)
            .bind(cursor.map(|c| c.created_at))
            .bind(cursor.and_then(|c| c.id))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn reply_counts(&self, post_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, i64>> {
        self.count_by_post(EdgeTable::Replies, post_ids).await
    }

    async fn retweet_counts(&self, post_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, i64>> {
        self.count_by_post(EdgeTable::Retweets, post_ids).await
    }

    async fn like_counts(&self, post_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, i64>> {
        self.count_by_post(EdgeTable::Likes, post_ids).await
    }

    async fn liked_by(&self, viewer: &str, post_ids: &[Uuid]) -> StoreResult<HashSet<Uuid>> {
        self.edges_of_user(EdgeTable::Likes, viewer, post_ids).await
    }

    async fn retweeted_by(&self, viewer: &str, post_ids: &[Uuid]) -> StoreResult<HashSet<Uuid>> {
        self.edges_of_user(EdgeTable::Retweets, viewer, post_ids).await
    }

    async fn posts_since(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> StoreResult<Vec<PostRecord>> {
        let sql = format!(
            "{} WHERE t.created_at > $1 ORDER BY t.created_at DESC, t.id DESC LIMIT $2",
            POSTS_WITH_AUTHOR
        );
        let rows = sqlx::query_as::<_, FeedRow>(&sql)
            .bind(since)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }
}
