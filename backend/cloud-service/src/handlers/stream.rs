/// Live update stream - Server-Sent Events announcing new posts
///
/// Each connection polls the store on its own ticker and pushes a
/// `new-tweets` event when posts newer than its last check appear, followed
/// by a `heartbeat` every tick. The ticker dies with the response body when
/// the client disconnects.
use super::with_rate_limit_headers;
use crate::db::FeedStore;
use crate::error::Result;
use crate::middleware::requester_key;
use crate::models::{Author, PostRecord};
use crate::state::AppState;
use actix_web::http::header;
use actix_web::web::{self, Bytes};
use actix_web::{HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use futures::stream::{self, Stream};
use rate_limit::RateLimitPolicy;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, warn};
use uuid::Uuid;

/// Most posts announced per poll
pub const STREAM_BATCH: i64 = 10;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamPost {
    pub id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author: Option<Author>,
}

impl From<PostRecord> for StreamPost {
    fn from(record: PostRecord) -> Self {
        Self {
            id: record.post.id,
            content: record.post.content,
            created_at: record.post.created_at,
            author: record.author,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamEvent {
    #[serde(rename_all = "camelCase")]
    Connected { connection_id: Uuid },
    NewTweets { count: usize, tweets: Vec<StreamPost> },
    Heartbeat,
}

impl StreamEvent {
    /// One SSE `data:` frame
    pub fn to_frame(&self) -> Bytes {
        let payload = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        Bytes::from(format!("data: {}\n\n", payload))
    }
}

/// Per-connection polling state
struct UpdatePoller {
    store: Arc<dyn FeedStore>,
    ticker: Interval,
    last_check: DateTime<Utc>,
    pending: VecDeque<Bytes>,
}

impl UpdatePoller {
    fn new(store: Arc<dyn FeedStore>, period: Duration, connection_id: Uuid) -> Self {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut pending = VecDeque::new();
        pending.push_back(StreamEvent::Connected { connection_id }.to_frame());

        Self {
            store,
            ticker,
            last_check: Utc::now(),
            pending,
        }
    }

    async fn next_frame(&mut self) -> Bytes {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return frame;
            }
            self.ticker.tick().await;
            self.poll().await;
        }
    }

    async fn poll(&mut self) {
        match self.store.posts_since(self.last_check, STREAM_BATCH).await {
            Ok(rows) => {
                if let Some(newest) = rows.iter().map(|row| row.post.created_at).max() {
                    self.last_check = newest;
                }
                if !rows.is_empty() {
                    let tweets: Vec<StreamPost> = rows.into_iter().map(StreamPost::from).collect();
                    debug!(count = tweets.len(), "Streaming new posts");
                    self.pending.push_back(
                        StreamEvent::NewTweets {
                            count: tweets.len(),
                            tweets,
                        }
                        .to_frame(),
                    );
                }
            }
            Err(e) => warn!(error = %e, "Stream poll failed"),
        }
        self.pending.push_back(StreamEvent::Heartbeat.to_frame());
    }
}

/// Endless SSE body for one connection
pub fn update_stream(
    store: Arc<dyn FeedStore>,
    period: Duration,
    connection_id: Uuid,
) -> impl Stream<Item = std::result::Result<Bytes, actix_web::Error>> {
    stream::unfold(
        UpdatePoller::new(store, period, connection_id),
        |mut poller| async move {
            let frame = poller.next_frame().await;
            Some((Ok(frame), poller))
        },
    )
}

/// GET /api/stream
pub async fn stream_updates(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let decision = state.enforce(RateLimitPolicy::Read, &requester_key(&req))?;

    let connection_id = Uuid::new_v4();
    debug!(%connection_id, "Stream opened");

    let body = update_stream(state.feed.store(), state.stream_interval, connection_id);

    Ok(with_rate_limit_headers(
        HttpResponse::Ok()
            .insert_header((header::CONTENT_TYPE, "text/event-stream"))
            .insert_header((header::CACHE_CONTROL, "no-cache, no-transform"))
            .insert_header(("X-Accel-Buffering", "no"))
            .streaming(body),
        decision,
    ))
}
