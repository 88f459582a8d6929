//! PostgreSQL pool construction for Clouds services
//!
//! [`create_pool`] connects and verifies the pool; [`PoolMonitor`] keeps the
//! `db_pool_connections` gauges current until the pool closes. Query
//! timeouts are owned here: callers propagate pool errors untouched.

mod config;
mod metrics;
mod monitor;

pub use config::DbConfig;
pub use monitor::PoolMonitor;

use sqlx::postgres::PgPool;
use tracing::{error, info};

/// Connect a pool and check it answers `SELECT 1` within the connect timeout.
pub async fn create_pool(config: &DbConfig) -> Result<PgPool, sqlx::Error> {
    let pool = config.pool_options().connect(&config.database_url).await?;

    let check = sqlx::query("SELECT 1").execute(&pool);
    match tokio::time::timeout(config.connect_timeout(), check).await {
        Ok(Ok(_)) => {
            info!(service = %config.service_name, "Database pool ready");
            Ok(pool)
        }
        Ok(Err(e)) => {
            error!(service = %config.service_name, error = %e, "Database verification failed");
            pool.close().await;
            Err(e)
        }
        Err(_) => {
            error!(
                service = %config.service_name,
                timeout_secs = config.connect_timeout_secs,
                "Database verification timed out"
            );
            pool.close().await;
            Err(sqlx::Error::PoolTimedOut)
        }
    }
}

/// Start the gauge refresh for `pool` at the configured interval
pub fn monitor_pool(pool: &PgPool, config: &DbConfig) -> PoolMonitor {
    PoolMonitor::start(pool.clone(), config.service_name.clone(), config.metrics_interval())
}
