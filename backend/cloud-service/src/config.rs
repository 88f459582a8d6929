/// Configuration management for cloud-service
///
/// Values come from environment variables (a `.env` file is loaded first by
/// the binary). Every group has working defaults except the database URL,
/// which is only required for the PostgreSQL backend.
use crate::services::moderation::ModerationFilter;
use crate::services::FeedSettings;
use db_pool::DbConfig;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

pub const SERVICE_NAME: &str = "cloud-service";

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Storage backend selection
    pub store: StoreConfig,
    /// Pool settings, present for the PostgreSQL backend
    pub database: Option<DbConfig>,
    /// Rate limiting
    pub rate_limit: RateLimitSettings,
    /// Banned-term filter
    pub moderation: ModerationConfig,
    /// Feed page sizing
    pub feed: FeedConfig,
    /// Moderator accounts
    pub admin: AdminConfig,
    /// Live update stream
    pub stream: StreamConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
    /// Log output format
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown STORE_BACKEND '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Whether write/read routes are limited at all
    pub enabled: bool,
    /// Expired-window sweep interval
    pub sweep_interval_secs: u64,
}

impl RateLimitSettings {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// Banned terms, already split and trimmed
    pub banned_words: Vec<String>,
}

impl ModerationConfig {
    pub fn filter(&self) -> ModerationFilter {
        ModerationFilter::new(&self.banned_words)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub default_page_size: i64,
    pub max_page_size: i64,
}

impl FeedConfig {
    pub fn settings(&self) -> FeedSettings {
        FeedSettings {
            default_page_size: self.default_page_size,
            max_page_size: self.max_page_size,
        }
    }
}

/// Accounts allowed to delete any post or user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    pub user_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// How often `/api/stream` polls for new posts
    pub poll_interval_secs: u64,
}

impl StreamConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

fn env_list(key: &str) -> Vec<String> {
    env_or(key, "")
        .split(',')
        .map(|w| w.trim().to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let backend = match std::env::var("STORE_BACKEND") {
            Ok(value) => value.parse::<StoreBackend>()?,
            Err(_) => StoreBackend::Postgres,
        };

        let database = match backend {
            StoreBackend::Postgres => Some(DbConfig::from_env(SERVICE_NAME)?),
            StoreBackend::Memory => None,
        };

        let log_format = match env_or("LOG_FORMAT", "text").to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };

        let feed = FeedConfig {
            default_page_size: env_parse("FEED_DEFAULT_PAGE_SIZE", 20),
            max_page_size: env_parse("FEED_MAX_PAGE_SIZE", 50),
        };
        if feed.max_page_size < 1 {
            return Err("FEED_MAX_PAGE_SIZE must be at least 1".to_string());
        }
        if !(1..=feed.max_page_size).contains(&feed.default_page_size) {
            return Err(format!(
                "FEED_DEFAULT_PAGE_SIZE must be between 1 and {}",
                feed.max_page_size
            ));
        }

        let stream = StreamConfig {
            poll_interval_secs: env_parse("STREAM_POLL_INTERVAL_SECS", 10),
        };
        if stream.poll_interval_secs == 0 {
            return Err("STREAM_POLL_INTERVAL_SECS must be at least 1".to_string());
        }

        Ok(Config {
            app: AppConfig {
                env: env_or("APP_ENV", "development"),
                host: env_or("CLOUD_SERVICE_HOST", "0.0.0.0"),
                port: env_parse("CLOUD_SERVICE_PORT", 8080),
                log_format,
            },
            store: StoreConfig { backend },
            database,
            rate_limit: RateLimitSettings {
                enabled: env_parse("RATE_LIMIT_ENABLED", true),
                sweep_interval_secs: env_parse("RATE_LIMIT_SWEEP_INTERVAL_SECS", 60),
            },
            moderation: ModerationConfig {
                banned_words: env_list("BANNED_WORDS"),
            },
            feed,
            admin: AdminConfig {
                user_ids: env_list("ADMIN_USER_IDS"),
            },
            stream,
        })
    }

    pub fn is_production(&self) -> bool {
        self.app.env.eq_ignore_ascii_case("production")
    }
}
