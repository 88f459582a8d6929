/// Write-side queries over PostgreSQL
use super::feed_repo::EdgeTable;
use super::{ContentStore, PgStore, StoreError, StoreResult};
use crate::models::{
    Activity, LikeGiven, LikeReceived, Post, ProfilePost, ProfileUpdate, ToggleOutcome,
    UserProfile,
};
use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

async fn ensure_post_exists(tx: &mut Transaction<'_, Postgres>, post_id: Uuid) -> StoreResult<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tweets WHERE id = $1)")
        .bind(post_id)
        .fetch_one(&mut **tx)
        .await?;

    if exists {
        Ok(())
    } else {
        Err(StoreError::NotFound("post"))
    }
}

/// Row-lock a post for the rest of the transaction.
///
/// `FOR NO KEY UPDATE` serialises concurrent toggles on the same post while
/// still letting foreign-key inserts (replies) proceed.
async fn lock_post(tx: &mut Transaction<'_, Postgres>, post_id: Uuid) -> StoreResult<()> {
    let locked: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM tweets WHERE id = $1 FOR NO KEY UPDATE")
            .bind(post_id)
            .fetch_optional(&mut **tx)
            .await?;

    locked.map(|_| ()).ok_or(StoreError::NotFound("post"))
}

/// Insert a bare `users` row for a viewer seen for the first time
async fn ensure_user(tx: &mut Transaction<'_, Postgres>, user_id: &str) -> StoreResult<()> {
    sqlx::query("INSERT INTO users (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Escape LIKE wildcards so user input matches literally
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

impl PgStore {
    async fn toggle_edge(
        &self,
        table: EdgeTable,
        user_id: &str,
        post_id: Uuid,
    ) -> StoreResult<ToggleOutcome> {
        let mut tx = self.pool.begin().await?;
        lock_post(&mut tx, post_id).await?;
        ensure_user(&mut tx, user_id).await?;

        let removed = sqlx::query(&format!(
            "DELETE FROM {} WHERE user_id = $1 AND tweet_id = $2",
            table.name()
        ))
        .bind(user_id)
        .bind(post_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if removed == 0 {
            sqlx::query(&format!(
                "INSERT INTO {} (user_id, tweet_id) VALUES ($1, $2) ON CONFLICT (user_id, tweet_id) DO NOTHING",
                table.name()
            ))
            .bind(user_id)
            .bind(post_id)
            .execute(&mut *tx)
            .await?;
        }

        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE tweet_id = $1",
            table.name()
        ))
        .bind(post_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ToggleOutcome {
            active: removed == 0,
            count,
        })
    }
}

#[async_trait]
impl ContentStore for PgStore {
    async fn create_post(
        &self,
        author_id: &str,
        content: &str,
        parent_id: Option<Uuid>,
    ) -> StoreResult<Post> {
        let mut tx = self.pool.begin().await?;
        if let Some(parent_id) = parent_id {
            ensure_post_exists(&mut tx, parent_id).await?;
        }
        ensure_user(&mut tx, author_id).await?;

        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO tweets (content, author_id, parent_id)
            VALUES ($1, $2, $3)
            RETURNING id, content, author_id, parent_id, created_at
            "#,
        )
        .bind(content)
        .bind(author_id)
        .bind(parent_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(post)
    }

    async fn toggle_like(&self, user_id: &str, post_id: Uuid) -> StoreResult<ToggleOutcome> {
        self.toggle_edge(EdgeTable::Likes, user_id, post_id).await
    }

    async fn toggle_retweet(&self, user_id: &str, post_id: Uuid) -> StoreResult<ToggleOutcome> {
        self.toggle_edge(EdgeTable::Retweets, user_id, post_id).await
    }

    async fn add_reply(&self, user_id: &str, post_id: Uuid, content: &str) -> StoreResult<i64> {
        let mut tx = self.pool.begin().await?;
        ensure_post_exists(&mut tx, post_id).await?;
        ensure_user(&mut tx, user_id).await?;

        sqlx::query("INSERT INTO replies (tweet_id, user_id, content) VALUES ($1, $2, $3)")
            .bind(post_id)
            .bind(user_id)
            .bind(content)
            .execute(&mut *tx)
            .await?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM replies WHERE tweet_id = $1")
            .bind(post_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(count)
    }

    async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> StoreResult<UserProfile> {
        sqlx::query_as::<_, UserProfile>(
            r#"
            INSERT INTO users (id, name, bio, image)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET name = COALESCE(EXCLUDED.name, users.name),
                bio = COALESCE(EXCLUDED.bio, users.bio),
                image = COALESCE(EXCLUDED.image, users.image)
            RETURNING id, username, name, image, bio, created_at
            "#,
        )
        .bind(user_id)
        .bind(update.name.as_deref())
        .bind(update.bio.as_deref())
        .bind(update.image.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from)
    }

    async fn search_users(&self, query: &str, limit: i64) -> StoreResult<Vec<UserProfile>> {
        let users = if query.is_empty() {
            sqlx::query_as::<_, UserProfile>(
                r#"
                SELECT id, username, name, image, bio, created_at
                FROM users
                ORDER BY created_at DESC NULLS LAST
                LIMIT $1
                "#,
            )
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, UserProfile>(
                r#"
                SELECT id, username, name, image, bio, created_at
                FROM users
                WHERE name ILIKE $1 OR username ILIKE $1
                ORDER BY created_at DESC NULLS LAST
                LIMIT $2
                "#,
            )
            .bind(like_pattern(query))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        };

        Ok(users)
    }

    async fn count_posts(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tweets")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn post_author(&self, post_id: Uuid) -> StoreResult<Option<String>> {
        let author = sqlx::query_scalar("SELECT author_id FROM tweets WHERE id = $1")
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(author)
    }

    async fn delete_post(&self, post_id: Uuid) -> StoreResult<()> {
        // likes, retweets and replies cascade through their foreign keys
        let deleted = sqlx::query("DELETE FROM tweets WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(StoreError::NotFound("post"));
        }
        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let found: Option<String> =
            sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        if found.is_none() {
            return Err(StoreError::NotFound("user"));
        }

        // tweets.author_id has no foreign key, so the user's posts go first
        let posts = sqlx::query("DELETE FROM tweets WHERE author_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::debug!(user_id, posts, "Deleted user and their posts");
        Ok(())
    }

    async fn get_profile(&self, user_id: &str) -> StoreResult<Option<UserProfile>> {
        let profile = sqlx::query_as::<_, UserProfile>(
            "SELECT id, username, name, image, bio, created_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    async fn posts_by_author(&self, author_id: &str, limit: i64) -> StoreResult<Vec<ProfilePost>> {
        let posts = sqlx::query_as::<_, ProfilePost>(
            r#"
            SELECT t.id, t.content, t.parent_id, t.created_at, COUNT(l.id) AS like_count
            FROM tweets t
            LEFT JOIN likes l ON l.tweet_id = t.id
            WHERE t.author_id = $1
            GROUP BY t.id
            ORDER BY t.created_at DESC, t.id DESC
            LIMIT $2
            "#,
        )
        .bind(author_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }

    async fn activity(&self, user_id: &str, limit: i64) -> StoreResult<Activity> {
        let received = sqlx::query_as::<_, LikeReceived>(
            r#"
            SELECT l.created_at AS liked_at,
                   t.id AS tweet_id,
                   t.content AS tweet_content,
                   l.user_id AS liker_id,
                   u.name AS liker_name,
                   u.username AS liker_username
            FROM likes l
            JOIN tweets t ON t.id = l.tweet_id
            LEFT JOIN users u ON u.id = l.user_id
            WHERE t.author_id = $1
            ORDER BY l.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool);

        let given = sqlx::query_as::<_, LikeGiven>(
            r#"
            SELECT l.created_at AS liked_at,
                   l.tweet_id,
                   t.content AS tweet_content
            FROM likes l
            LEFT JOIN tweets t ON t.id = l.tweet_id
            WHERE l.user_id = $1
            ORDER BY l.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool);

        let (received, given) = tokio::try_join!(received, given)?;
        Ok(Activity { received, given })
    }
}
