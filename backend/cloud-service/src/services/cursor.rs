//! Feed cursor and page-size parsing
//!
//! The feed is ordered by `(created_at DESC, id DESC)`. A cursor names the last
//! row of the previous page; the next page holds rows strictly older than it.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::models::Post;

/// Position after which the next feed page starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedCursor {
    pub created_at: DateTime<Utc>,
    /// Tie-breaker for posts sharing a timestamp. Without it the cursor
    /// compares on `created_at` alone.
    pub id: Option<Uuid>,
}

impl FeedCursor {
    /// Parse the `cursor`/`cursorId` query pair.
    ///
    /// Returns `None` when the timestamp is missing or not RFC 3339, which the
    /// feed treats as "first page". A malformed id is dropped and the cursor
    /// falls back to timestamp-only comparison.
    pub fn parse(cursor: Option<&str>, cursor_id: Option<&str>) -> Option<Self> {
        let raw = cursor.map(str::trim).filter(|s| !s.is_empty())?;
        let created_at = DateTime::parse_from_rfc3339(raw)
            .ok()?
            .with_timezone(&Utc);
        let id = cursor_id.and_then(|s| Uuid::parse_str(s.trim()).ok());

        Some(Self { created_at, id })
    }

    /// Cursor pointing just past `post`
    pub fn after(post: &Post) -> Self {
        Self {
            created_at: post.created_at,
            id: Some(post.id),
        }
    }

    /// Whether a row at `(created_at, id)` belongs after this cursor
    pub fn admits(&self, created_at: DateTime<Utc>, id: Uuid) -> bool {
        match self.id {
            Some(cursor_id) => (created_at, id) < (self.created_at, cursor_id),
            None => created_at < self.created_at,
        }
    }

    /// RFC 3339 rendering that keeps the stored sub-second precision
    pub fn timestamp_string(&self) -> String {
        self.created_at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}

/// Parse a raw `limit` query value. Anything non-numeric is `None`.
pub fn parse_limit(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_rfc3339_cursor() {
        let cursor = FeedCursor::parse(Some("2024-05-01T12:00:00.250Z"), None).unwrap();
        assert_eq!(
            cursor.created_at,
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
                + chrono::Duration::milliseconds(250)
        );
        assert_eq!(cursor.id, None);
    }

    #[test]
    fn test_parse_offset_is_normalised_to_utc() {
        let cursor = FeedCursor::parse(Some("2024-05-01T14:00:00+02:00"), None).unwrap();
        assert_eq!(
            cursor.created_at,
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_unparsable_cursor_is_absent() {
        assert!(FeedCursor::parse(Some("yesterday"), None).is_none());
        assert!(FeedCursor::parse(Some(""), None).is_none());
        assert!(FeedCursor::parse(Some("1714564800"), None).is_none());
        assert!(FeedCursor::parse(None, Some(&Uuid::new_v4().to_string())).is_none());
    }

    #[test]
    fn test_bad_cursor_id_is_dropped() {
        let cursor = FeedCursor::parse(Some("2024-05-01T12:00:00Z"), Some("not-a-uuid")).unwrap();
        assert_eq!(cursor.id, None);
    }

    #[test]
    fn test_admits_timestamp_only() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let cursor = FeedCursor { created_at: at, id: None };

        assert!(cursor.admits(at - chrono::Duration::seconds(1), Uuid::new_v4()));
        assert!(!cursor.admits(at, Uuid::new_v4()));
        assert!(!cursor.admits(at + chrono::Duration::seconds(1), Uuid::new_v4()));
    }

    #[test]
    fn test_admits_breaks_ties_on_id() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let low = Uuid::from_u128(1);
        let high = Uuid::from_u128(2);
        let cursor = FeedCursor {
            created_at: at,
            id: Some(high),
        };

        assert!(cursor.admits(at, low));
        assert!(!cursor.admits(at, high));
    }

    #[test]
    fn test_timestamp_string_round_trips() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
            + chrono::Duration::microseconds(123_456);
        let cursor = FeedCursor { created_at: at, id: None };
        assert_eq!(cursor.timestamp_string(), "2024-05-01T12:00:00.123456Z");
        assert_eq!(
            FeedCursor::parse(Some(&cursor.timestamp_string()), None),
            Some(cursor)
        );
    }

    #[test]
    fn test_parse_limit() {
        assert_eq!(parse_limit(Some("7")), Some(7));
        assert_eq!(parse_limit(Some(" 12 ")), Some(12));
        assert_eq!(parse_limit(Some("-3")), Some(-3));
        assert_eq!(parse_limit(Some("abc")), None);
        assert_eq!(parse_limit(None), None);
    }
}
