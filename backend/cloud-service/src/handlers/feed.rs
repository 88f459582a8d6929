/// Feed handler - cursor-paginated home timeline
use super::with_rate_limit_headers;
use crate::error::Result;
use crate::middleware::{requester_key, Viewer};
use crate::models::FeedResponse;
use crate::services::cursor::{parse_limit, FeedCursor};
use crate::state::AppState;
use actix_web::{web, HttpRequest, HttpResponse};
use rate_limit::RateLimitPolicy;

/// Raw query parameters. Parsing is lenient: bad values fall back to defaults.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FeedQuery {
    pub cursor: Option<String>,
    pub cursor_id: Option<String>,
    pub limit: Option<String>,
}

impl FeedQuery {
    /// Read `cursor`, `cursorId` and `limit` from a raw query string.
    ///
    /// A repeated key keeps its first value, unknown keys are ignored, and an
    /// undecodable query string reads as empty.
    pub fn from_query_string(query: &str) -> Self {
        let pairs = web::Query::<Vec<(String, String)>>::from_query(query)
            .map(web::Query::into_inner)
            .unwrap_or_default();

        let mut parsed = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "cursor" => &mut parsed.cursor,
                "cursorId" => &mut parsed.cursor_id,
                "limit" => &mut parsed.limit,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        parsed
    }
}

/// GET /api/tweets
pub async fn get_feed(
    state: web::Data<AppState>,
    req: HttpRequest,
    viewer: Viewer,
) -> Result<HttpResponse> {
    let decision = state.enforce(RateLimitPolicy::Read, &requester_key(&req))?;

    let query = FeedQuery::from_query_string(req.query_string());
    let cursor = FeedCursor::parse(query.cursor.as_deref(), query.cursor_id.as_deref());
    let limit = parse_limit(query.limit.as_deref());

    let page = state.feed.get_page(cursor, limit, viewer.id()).await?;

    tracing::debug!(
        returned = page.posts.len(),
        has_more = page.has_more,
        "Feed page served"
    );

    Ok(with_rate_limit_headers(
        HttpResponse::Ok().json(FeedResponse::from(page)),
        decision,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_reads_known_keys() {
        let query = FeedQuery::from_query_string(
            "cursor=2024-05-01T12%3A00%3A00Z&cursorId=abc&limit=5&extra=1",
        );
        assert_eq!(query.cursor.as_deref(), Some("2024-05-01T12:00:00Z"));
        assert_eq!(query.cursor_id.as_deref(), Some("abc"));
        assert_eq!(query.limit.as_deref(), Some("5"));
    }

    #[test]
    fn test_repeated_key_keeps_first_value() {
        let query = FeedQuery::from_query_string("limit=5&limit=6&cursor=bad&cursor=worse");
        assert_eq!(query.limit.as_deref(), Some("5"));
        assert_eq!(query.cursor.as_deref(), Some("bad"));
    }

    #[test]
    fn test_empty_query_is_default() {
        assert_eq!(FeedQuery::from_query_string(""), FeedQuery::default());
    }
}
