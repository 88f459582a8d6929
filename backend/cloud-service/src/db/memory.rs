/// In-process store for local development and tests
///
/// Mirrors the PostgreSQL semantics: feed ordering on `(created_at, id)`,
/// unique like/retweet edges, and first-write user rows.
use super::{ContentStore, FeedStore, StoreError, StoreResult};
use crate::models::{
    Activity, Author, LikeGiven, LikeReceived, Post, PostRecord, ProfilePost, ProfileUpdate,
    ToggleOutcome, UserProfile,
};
use crate::services::cursor::FeedCursor;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct ReplyRow {
    post_id: Uuid,
    user_id: String,
    content: String,
}

/// Like/retweet edges keyed by `(user_id, post_id)`, valued by creation time
type Edges = HashMap<(String, Uuid), DateTime<Utc>>;

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<String, UserProfile>,
    posts: HashMap<Uuid, Post>,
    likes: Edges,
    retweets: Edges,
    replies: Vec<ReplyRow>,
}

impl MemoryState {
    fn ensure_user(&mut self, user_id: &str) {
        self.users
            .entry(user_id.to_string())
            .or_insert_with(|| UserProfile {
                id: user_id.to_string(),
                username: None,
                name: None,
                image: None,
                bio: None,
                created_at: Some(Utc::now()),
            });
    }

    fn ensure_post(&self, post_id: Uuid) -> StoreResult<()> {
        if self.posts.contains_key(&post_id) {
            Ok(())
        } else {
            Err(StoreError::NotFound("post"))
        }
    }

    fn author_of(&self, post: &Post) -> Option<Author> {
        self.users.get(&post.author_id).map(|user| Author {
            id: user.id.clone(),
            username: user.username.clone(),
            name: user.name.clone(),
            image: user.image.clone(),
        })
    }

    fn record(&self, post: &Post) -> PostRecord {
        PostRecord {
            author: self.author_of(post),
            post: post.clone(),
        }
    }

    /// Drop posts matching `doomed` together with every edge and reply on them
    fn purge_posts(&mut self, doomed: impl Fn(&Post) -> bool) {
        let ids: HashSet<Uuid> = self
            .posts
            .values()
            .filter(|post| doomed(post))
            .map(|post| post.id)
            .collect();

        self.posts.retain(|id, _| !ids.contains(id));
        self.likes.retain(|(_, post_id), _| !ids.contains(post_id));
        self.retweets.retain(|(_, post_id), _| !ids.contains(post_id));
        self.replies.retain(|reply| !ids.contains(&reply.post_id));
    }
}

fn count_edges(edges: &Edges, post_ids: &[Uuid]) -> HashMap<Uuid, i64> {
    let wanted: HashSet<&Uuid> = post_ids.iter().collect();
    let mut counts = HashMap::new();
    for (_, post_id) in edges.keys().filter(|(_, id)| wanted.contains(id)) {
        *counts.entry(*post_id).or_insert(0) += 1;
    }
    counts
}

fn edges_of(edges: &Edges, user_id: &str, post_ids: &[Uuid]) -> HashSet<Uuid> {
    post_ids
        .iter()
        .filter(|id| edges.contains_key(&(user_id.to_string(), **id)))
        .copied()
        .collect()
}

fn toggle(edges: &mut Edges, user_id: &str, post_id: Uuid) -> ToggleOutcome {
    let key = (user_id.to_string(), post_id);
    let active = if edges.remove(&key).is_some() {
        false
    } else {
        edges.insert(key, Utc::now());
        true
    };
    let count = edges.keys().filter(|(_, id)| *id == post_id).count() as i64;

    ToggleOutcome { active, count }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    /// Seed or replace a user row
    pub fn insert_user(&self, id: &str, username: &str, name: &str) -> StoreResult<UserProfile> {
        let profile = UserProfile {
            id: id.to_string(),
            username: Some(username.to_string()),
            name: Some(name.to_string()),
            image: None,
            bio: None,
            created_at: Some(Utc::now()),
        };
        self.write()?.users.insert(id.to_string(), profile.clone());
        Ok(profile)
    }

    /// Seed a post with an explicit timestamp
    pub fn insert_post_at(
        &self,
        author_id: &str,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> StoreResult<Post> {
        let post = Post {
            id: Uuid::new_v4(),
            content: content.to_string(),
            author_id: author_id.to_string(),
            parent_id: None,
            created_at,
        };
        self.write()?.posts.insert(post.id, post.clone());
        Ok(post)
    }

    /// Seed a like with an explicit timestamp
    pub fn insert_like_at(
        &self,
        user_id: &str,
        post_id: Uuid,
        liked_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut state = self.write()?;
        state.ensure_post(post_id)?;
        state.likes.insert((user_id.to_string(), post_id), liked_at);
        Ok(())
    }

    /// Delete a user row, cascading to their edges but leaving their posts
    /// behind as orphans
    pub fn remove_user(&self, id: &str) -> StoreResult<()> {
        let mut state = self.write()?;
        state.users.remove(id);
        state.likes.retain(|(user_id, _), _| user_id != id);
        state.retweets.retain(|(user_id, _), _| user_id != id);
        state.replies.retain(|reply| reply.user_id != id);
        Ok(())
    }

    /// Reply bodies on a post, oldest first
    pub fn reply_contents(&self, post_id: Uuid) -> StoreResult<Vec<String>> {
        Ok(self
            .read()?
            .replies
            .iter()
            .filter(|r| r.post_id == post_id)
            .map(|r| r.content.clone())
            .collect())
    }
}

#[async_trait]
impl FeedStore for InMemoryStore {
    async fn fetch_posts(
        &self,
        cursor: Option<&FeedCursor>,
        limit: i64,
    ) -> StoreResult<Vec<PostRecord>> {
        let state = self.read()?;

        let mut posts: Vec<&Post> = state
            .posts
            .values()
            .filter(|post| cursor.map_or(true, |c| c.admits(post.created_at, post.id)))
            .collect();
        posts.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        Ok(posts
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|post| state.record(post))
            .collect())
    }

    async fn reply_counts(&self, post_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, i64>> {
        let state = self.read()?;
        let wanted: HashSet<&Uuid> = post_ids.iter().collect();
        let mut counts = HashMap::new();
        for reply in state.replies.iter().filter(|r| wanted.contains(&r.post_id)) {
            *counts.entry(reply.post_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn retweet_counts(&self, post_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, i64>> {
        Ok(count_edges(&self.read()?.retweets, post_ids))
    }

    async fn like_counts(&self, post_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, i64>> {
        Ok(count_edges(&self.read()?.likes, post_ids))
    }

    async fn liked_by(&self, viewer: &str, post_ids: &[Uuid]) -> StoreResult<HashSet<Uuid>> {
        Ok(edges_of(&self.read()?.likes, viewer, post_ids))
    }

    async fn retweeted_by(&self, viewer: &str, post_ids: &[Uuid]) -> StoreResult<HashSet<Uuid>> {
        Ok(edges_of(&self.read()?.retweets, viewer, post_ids))
    }

    async fn posts_since(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> StoreResult<Vec<PostRecord>> {
        let state = self.read()?;

        let mut posts: Vec<&Post> = state
            .posts
            .values()
            .filter(|post| post.created_at > since)
            .collect();
        posts.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        Ok(posts
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|post| state.record(post))
            .collect())
    }
}

#[async_trait]
impl ContentStore for InMemoryStore {
    async fn create_post(
        &self,
        author_id: &str,
        content: &str,
        parent_id: Option<Uuid>,
    ) -> StoreResult<Post> {
        let mut state = self.write()?;
        if let Some(parent_id) = parent_id {
            state.ensure_post(parent_id)?;
        }
        state.ensure_user(author_id);

        let post = Post {
            id: Uuid::new_v4(),
            content: content.to_string(),
            author_id: author_id.to_string(),
            parent_id,
            created_at: Utc::now(),
        };
        state.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn toggle_like(&self, user_id: &str, post_id: Uuid) -> StoreResult<ToggleOutcome> {
        let mut state = self.write()?;
        state.ensure_post(post_id)?;
        state.ensure_user(user_id);
        Ok(toggle(&mut state.likes, user_id, post_id))
    }

    async fn toggle_retweet(&self, user_id: &str, post_id: Uuid) -> StoreResult<ToggleOutcome> {
        let mut state = self.write()?;
        state.ensure_post(post_id)?;
        state.ensure_user(user_id);
        Ok(toggle(&mut state.retweets, user_id, post_id))
    }

    async fn add_reply(&self, user_id: &str, post_id: Uuid, content: &str) -> StoreResult<i64> {
        let mut state = self.write()?;
        state.ensure_post(post_id)?;
        state.ensure_user(user_id);
        state.replies.push(ReplyRow {
            post_id,
            user_id: user_id.to_string(),
            content: content.to_string(),
        });
        Ok(state.replies.iter().filter(|r| r.post_id == post_id).count() as i64)
    }

    async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> StoreResult<UserProfile> {
        let mut state = self.write()?;
        state.ensure_user(user_id);

        let profile = state
            .users
            .get_mut(user_id)
            .ok_or(StoreError::NotFound("user"))?;
        if let Some(name) = &update.name {
            profile.name = Some(name.clone());
        }
        if let Some(bio) = &update.bio {
            profile.bio = Some(bio.clone());
        }
        if let Some(image) = &update.image {
            profile.image = Some(image.clone());
        }
        Ok(profile.clone())
    }

    async fn search_users(&self, query: &str, limit: i64) -> StoreResult<Vec<UserProfile>> {
        let state = self.read()?;
        let needle = query.to_lowercase();
        let matches = |field: &Option<String>| {
            field
                .as_deref()
                .map_or(false, |value| value.to_lowercase().contains(&needle))
        };

        let mut users: Vec<UserProfile> = state
            .users
            .values()
            .filter(|user| needle.is_empty() || matches(&user.name) || matches(&user.username))
            .cloned()
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        users.truncate(limit.max(0) as usize);
        Ok(users)
    }

    async fn count_posts(&self) -> StoreResult<i64> {
        Ok(self.read()?.posts.len() as i64)
    }

    async fn post_author(&self, post_id: Uuid) -> StoreResult<Option<String>> {
        Ok(self
            .read()?
            .posts
            .get(&post_id)
            .map(|post| post.author_id.clone()))
    }

    async fn delete_post(&self, post_id: Uuid) -> StoreResult<()> {
        let mut state = self.write()?;
        state.ensure_post(post_id)?;
        state.purge_posts(|post| post.id == post_id);
        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.users.remove(user_id).is_none() {
            return Err(StoreError::NotFound("user"));
        }

        state.purge_posts(|post| post.author_id == user_id);
        state.likes.retain(|(liker, _), _| liker != user_id);
        state.retweets.retain(|(retweeter, _), _| retweeter != user_id);
        state.replies.retain(|reply| reply.user_id != user_id);
        Ok(())
    }

    async fn get_profile(&self, user_id: &str) -> StoreResult<Option<UserProfile>> {
        Ok(self.read()?.users.get(user_id).cloned())
    }

    async fn posts_by_author(&self, author_id: &str, limit: i64) -> StoreResult<Vec<ProfilePost>> {
        let state = self.read()?;

        let mut posts: Vec<&Post> = state
            .posts
            .values()
            .filter(|post| post.author_id == author_id)
            .collect();
        posts.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        posts.truncate(limit.max(0) as usize);

        let ids: Vec<Uuid> = posts.iter().map(|post| post.id).collect();
        let likes = count_edges(&state.likes, &ids);

        Ok(posts
            .into_iter()
            .map(|post| ProfilePost {
                id: post.id,
                content: post.content.clone(),
                parent_id: post.parent_id,
                created_at: post.created_at,
                like_count: likes.get(&post.id).copied().unwrap_or(0),
            })
            .collect())
    }

    async fn activity(&self, user_id: &str, limit: i64) -> StoreResult<Activity> {
        let state = self.read()?;
        let limit = limit.max(0) as usize;

        let mut received: Vec<LikeReceived> = state
            .likes
            .iter()
            .filter_map(|((liker_id, post_id), liked_at)| {
                let post = state.posts.get(post_id)?;
                if post.author_id != user_id {
                    return None;
                }
                let liker = state.users.get(liker_id);
                Some(LikeReceived {
                    liked_at: *liked_at,
                    tweet_id: post.id,
                    tweet_content: post.content.clone(),
                    liker_id: liker_id.clone(),
                    liker_name: liker.and_then(|u| u.name.clone()),
                    liker_username: liker.and_then(|u| u.username.clone()),
                })
            })
            .collect();
        received.sort_by(|a, b| b.liked_at.cmp(&a.liked_at));
        received.truncate(limit);

        let mut given: Vec<LikeGiven> = state
            .likes
            .iter()
            .filter(|((liker_id, _), _)| liker_id == user_id)
            .map(|((_, post_id), liked_at)| LikeGiven {
                liked_at: *liked_at,
                tweet_id: *post_id,
                tweet_content: state.posts.get(post_id).map(|post| post.content.clone()),
            })
            .collect();
        given.sort_by(|a, b| b.liked_at.cmp(&a.liked_at));
        given.truncate(limit);

        Ok(Activity { received, given })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_orders_newest_first_and_marks_orphans() {
        let store = InMemoryStore::new();
        store.insert_user("alice", "alice", "Alice").unwrap();
        store.insert_post_at("alice", "old", at(10)).unwrap();
        store.insert_post_at("ghost", "orphan", at(20)).unwrap();
        store.insert_post_at("alice", "new", at(30)).unwrap();

        let rows = store.fetch_posts(None, 10).await.unwrap();
        let contents: Vec<&str> = rows.iter().map(|r| r.post.content.as_str()).collect();
        assert_eq!(contents, vec!["new", "orphan", "old"]);
        assert!(rows[1].author.is_none());
        assert_eq!(rows[0].author.as_ref().unwrap().name.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn test_toggle_like_flips_edge() {
        let store = InMemoryStore::new();
        let post = store.insert_post_at("alice", "hi", at(10)).unwrap();

        let first = store.toggle_like("bob", post.id).await.unwrap();
        assert_eq!(first, ToggleOutcome { active: true, count: 1 });

        let second = store.toggle_like("bob", post.id).await.unwrap();
        assert_eq!(second, ToggleOutcome { active: false, count: 0 });
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_toggles_settle_consistently() {
        let store = std::sync::Arc::new(InMemoryStore::new());
        let post = store.insert_post_at("alice", "hot", at(10)).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.toggle_like("bob", post.id).await })
            })
            .collect();

        let mut activations = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().active {
                activations += 1;
            }
        }

        assert_eq!(activations, 4);
        assert!(store.like_counts(&[post.id]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_on_missing_post_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.toggle_retweet("bob", Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound("post")));
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let store = InMemoryStore::new();
        store.insert_user("u1", "skywalker", "Luke").unwrap();
        store.insert_user("u2", "leia", "Leia Organa").unwrap();

        let found = store.search_users("SKY", 50).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "u1");

        let all = store.search_users("", 50).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_posts_since_is_strict_and_newest_first() {
        let store = InMemoryStore::new();
        store.insert_user("alice", "alice", "Alice").unwrap();
        store.insert_post_at("alice", "old", at(10)).unwrap();
        store.insert_post_at("alice", "mid", at(20)).unwrap();
        store.insert_post_at("alice", "new", at(30)).unwrap();

        let rows = store.posts_since(at(10), 10).await.unwrap();
        let contents: Vec<&str> = rows.iter().map(|r| r.post.content.as_str()).collect();
        assert_eq!(contents, vec!["new", "mid"]);

        assert_eq!(store.posts_since(at(10), 1).await.unwrap().len(), 1);
        assert!(store.posts_since(at(30), 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_post_cascades_engagement() {
        let store = InMemoryStore::new();
        let post = store.insert_post_at("alice", "bye", at(10)).unwrap();
        store.toggle_like("bob", post.id).await.unwrap();
        store.toggle_retweet("bob", post.id).await.unwrap();
        store.add_reply("bob", post.id, "wait").await.unwrap();

        store.delete_post(post.id).await.unwrap();
        assert_eq!(store.count_posts().await.unwrap(), 0);
        assert!(store.like_counts(&[post.id]).await.unwrap().is_empty());
        assert!(store.reply_contents(post.id).unwrap().is_empty());
        assert!(store.activity("bob", 20).await.unwrap().given.is_empty());

        let err = store.delete_post(post.id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound("post")));
    }

    #[tokio::test]
    async fn test_delete_user_removes_posts_and_likes() {
        let store = InMemoryStore::new();
        store.insert_user("alice", "alice", "Alice").unwrap();
        store.insert_user("bob", "bob", "Bob").unwrap();
        let alices = store.insert_post_at("alice", "mine", at(10)).unwrap();
        let bobs = store.insert_post_at("bob", "his", at(20)).unwrap();
        store.toggle_like("alice", bobs.id).await.unwrap();
        store.toggle_like("bob", alices.id).await.unwrap();

        store.delete_user("alice").await.unwrap();

        let rows = store.fetch_posts(None, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].post.id, bobs.id);
        assert!(store.like_counts(&[bobs.id]).await.unwrap().is_empty());
        assert!(store.activity("bob", 20).await.unwrap().given.is_empty());
        assert!(store.get_profile("alice").await.unwrap().is_none());

        let err = store.delete_user("alice").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound("user")));
    }

    #[tokio::test]
    async fn test_posts_by_author_counts_likes() {
        let store = InMemoryStore::new();
        let first = store.insert_post_at("alice", "first", at(10)).unwrap();
        store.insert_post_at("alice", "second", at(20)).unwrap();
        store.insert_post_at("bob", "other", at(30)).unwrap();
        store.toggle_like("bob", first.id).await.unwrap();
        store.toggle_like("carol", first.id).await.unwrap();

        let posts = store.posts_by_author("alice", 10).await.unwrap();
        let summary: Vec<(&str, i64)> = posts
            .iter()
            .map(|p| (p.content.as_str(), p.like_count))
            .collect();
        assert_eq!(summary, vec![("second", 0), ("first", 2)]);
    }

    #[tokio::test]
    async fn test_activity_splits_received_and_given() {
        let store = InMemoryStore::new();
        store.insert_user("alice", "alice", "Alice").unwrap();
        store.insert_user("bob", "bob", "Bob").unwrap();
        let alices = store.insert_post_at("alice", "hello", at(10)).unwrap();
        let bobs = store.insert_post_at("bob", "hey", at(20)).unwrap();
        store.insert_like_at("bob", alices.id, at(100)).unwrap();
        store.insert_like_at("alice", alices.id, at(200)).unwrap();
        store.insert_like_at("alice", bobs.id, at(300)).unwrap();

        let activity = store.activity("alice", 20).await.unwrap();

        let likers: Vec<&str> = activity.received.iter().map(|l| l.liker_id.as_str()).collect();
        assert_eq!(likers, vec!["alice", "bob"]);
        assert_eq!(activity.received[1].liker_name.as_deref(), Some("Bob"));
        assert_eq!(activity.received[1].tweet_content, "hello");

        let given: Vec<Uuid> = activity.given.iter().map(|l| l.tweet_id).collect();
        assert_eq!(given, vec![bobs.id, alices.id]);

        let capped = store.activity("alice", 1).await.unwrap();
        assert_eq!(capped.received.len(), 1);
        assert_eq!(capped.given.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_user_orphans_posts() {
        let store = InMemoryStore::new();
        store.insert_user("alice", "alice", "Alice").unwrap();
        store.insert_post_at("alice", "hi", at(10)).unwrap();
        store.remove_user("alice").unwrap();

        let rows = store.fetch_posts(None, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].author.is_none());
    }
}
