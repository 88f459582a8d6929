/// Business logic layer for cloud-service
pub mod cursor;
pub mod feed;
pub mod moderation;

pub use cursor::FeedCursor;
pub use feed::{FeedError, FeedPaginator, FeedSettings};
pub use moderation::ModerationFilter;
