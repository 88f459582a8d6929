//! Cursor-paginated home feed
//!
//! A page is one newest-first query for `limit + 1` rows followed by five bulk
//! enrichment lookups that run concurrently. The extra row only signals that
//! another page exists and is never returned.

use crate::db::{FeedStore, StoreError};
use crate::metrics::{FEED_PAGE_DURATION_SECONDS, FEED_PAGE_SIZE};
use crate::models::{FeedPage, PostView};
use crate::services::cursor::FeedCursor;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 50;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to fetch feed page: {0}")]
    FetchFailed(#[from] StoreError),
}

/// Page size bounds
#[derive(Debug, Clone, Copy)]
pub struct FeedSettings {
    pub default_page_size: i64,
    pub max_page_size: i64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

#[derive(Clone)]
pub struct FeedPaginator {
    store: Arc<dyn FeedStore>,
    settings: FeedSettings,
}

impl FeedPaginator {
    pub fn new(store: Arc<dyn FeedStore>, settings: FeedSettings) -> Self {
        Self { store, settings }
    }

    /// Underlying post store, shared with the live update stream
    pub fn store(&self) -> Arc<dyn FeedStore> {
        self.store.clone()
    }

    /// Clamp a requested page size into `[1, max]`; absent means the default
    pub fn page_size(&self, requested: Option<i64>) -> i64 {
        let max = self.settings.max_page_size.max(1);
        requested
            .unwrap_or(self.settings.default_page_size)
            .clamp(1, max)
    }

    /// Assemble the page that follows `cursor` (or the first page).
    ///
    /// Posts whose author no longer resolves are dropped after the fetch, so a
    /// page can be shorter than `limit` while `has_more` is still true. The
    /// cursor always points at the last fetched row, orphan or not.
    pub async fn get_page(
        &self,
        cursor: Option<FeedCursor>,
        limit: Option<i64>,
        viewer: Option<&str>,
    ) -> Result<FeedPage, FeedError> {
        let started = Instant::now();
        let limit = self.page_size(limit);

        let mut rows = self.store.fetch_posts(cursor.as_ref(), limit + 1).await?;
        let has_more = rows.len() as i64 > limit;
        rows.truncate(limit as usize);

        let next_cursor = if has_more {
            rows.last().map(|row| FeedCursor::after(&row.post))
        } else {
            None
        };

        let post_ids: Vec<Uuid> = rows.iter().map(|row| row.post.id).collect();
        let (reply_counts, retweet_counts, like_counts, liked, retweeted) = if post_ids.is_empty() {
            Default::default()
        } else {
            let store = &self.store;
            let ids = post_ids.as_slice();
            tokio::try_join!(
                store.reply_counts(ids),
                store.retweet_counts(ids),
                store.like_counts(ids),
                async {
                    match viewer {
                        Some(viewer) => store.liked_by(viewer, ids).await,
                        None => Ok(HashSet::new()),
                    }
                },
                async {
                    match viewer {
                        Some(viewer) => store.retweeted_by(viewer, ids).await,
                        None => Ok(HashSet::new()),
                    }
                },
            )?
        };

        let fetched = rows.len();
        let posts: Vec<PostView> = rows
            .into_iter()
            .filter_map(|row| {
                let author = row.author?;
                let post = row.post;
                Some(PostView {
                    like_count: like_counts.get(&post.id).copied().unwrap_or(0),
                    reply_count: reply_counts.get(&post.id).copied().unwrap_or(0),
                    retweet_count: retweet_counts.get(&post.id).copied().unwrap_or(0),
                    viewer_has_liked: liked.contains(&post.id),
                    viewer_has_retweeted: retweeted.contains(&post.id),
                    id: post.id,
                    content: post.content,
                    author_id: post.author_id,
                    parent_id: post.parent_id,
                    created_at: post.created_at,
                    author,
                })
            })
            .collect();

        if posts.len() < fetched {
            debug!(
                orphaned = fetched - posts.len(),
                "Dropped posts with unresolved authors"
            );
        }

        FEED_PAGE_DURATION_SECONDS.observe(started.elapsed().as_secs_f64());
        FEED_PAGE_SIZE.observe(posts.len() as f64);

        Ok(FeedPage {
            posts,
            next_cursor,
            has_more,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;

    fn paginator() -> FeedPaginator {
        FeedPaginator::new(Arc::new(InMemoryStore::new()), FeedSettings::default())
    }

    #[test]
    fn test_page_size_clamping() {
        let paginator = paginator();
        assert_eq!(paginator.page_size(None), 20);
        assert_eq!(paginator.page_size(Some(0)), 1);
        assert_eq!(paginator.page_size(Some(-5)), 1);
        assert_eq!(paginator.page_size(Some(7)), 7);
        assert_eq!(paginator.page_size(Some(50)), 50);
        assert_eq!(paginator.page_size(Some(51)), 50);
        assert_eq!(paginator.page_size(Some(10_000)), 50);
    }

    #[tokio::test]
    async fn test_empty_store_yields_empty_page() {
        let page = paginator().get_page(None, None, Some("viewer")).await.unwrap();
        assert!(page.posts.is_empty());
        assert!(!page.has_more);
        assert!(page.next_cursor.is_none());
    }
}
