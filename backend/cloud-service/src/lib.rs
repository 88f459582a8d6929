/// Cloud Service Library
///
/// Backend for the Clouds microblog: publishing, likes/retweets/replies,
/// profiles and activity, post and account removal, user search, the
/// cursor-paginated home feed and its live update stream.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers
/// - `models`: Posts, profiles and feed view types
/// - `services`: Feed paginator, cursor parsing and moderation
/// - `db`: Storage traits with PostgreSQL and in-memory backends
/// - `middleware`: Viewer identity extraction and rate-limit keys
/// - `routes`: Route table
/// - `state`: Shared handler state and rate-limit enforcement
/// - `error`: Error types and handling
/// - `config`: Configuration management
/// - `metrics`: Observability and metrics collection
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use config::Config;
pub use error::{AppError, Result};
pub use state::AppState;
