use actix_web::{App, HttpServer};
use anyhow::Context;
use cloud_service::config::{LogFormat, StoreBackend, SERVICE_NAME};
use cloud_service::db::InMemoryStore;
use cloud_service::middleware::ViewerIdentity;
use cloud_service::{routes, AppState, Config};
use rate_limit::{FixedWindowLimiter, RateLimitSweeper};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into());

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(config.app.log_format);

    tracing::info!(
        env = %config.app.env,
        backend = ?config.store.backend,
        "Starting {}",
        SERVICE_NAME
    );

    let limiter = Arc::new(FixedWindowLimiter::new());
    let moderation = config.moderation.filter();
    let feed_settings = config.feed.settings();

    let mut pool_handles = None;
    let state = match (config.store.backend, config.database.as_ref()) {
        (StoreBackend::Postgres, Some(db_config)) => {
            db_config.log_config();
            let pool = db_pool::create_pool(db_config)
                .await
                .context("Failed to create database pool")?;
            let monitor = db_pool::monitor_pool(&pool, db_config);
            let state =
                AppState::with_pg_pool(pool.clone(), limiter.clone(), moderation, feed_settings);
            pool_handles = Some((pool, monitor));
            state
        }
        (StoreBackend::Postgres, None) => {
            anyhow::bail!("PostgreSQL backend selected without database configuration")
        }
        (StoreBackend::Memory, _) => {
            if config.is_production() {
                tracing::warn!("In-memory store selected in production; data will not persist");
            }
            AppState::with_memory_store(
                Arc::new(InMemoryStore::new()),
                limiter.clone(),
                moderation,
                feed_settings,
            )
        }
    }
    .with_rate_limiting(config.rate_limit.enabled)
    .with_admins(config.admin.user_ids.clone())
    .with_stream_interval(config.stream.poll_interval());

    let sweeper = RateLimitSweeper::start(limiter.clone(), config.rate_limit.sweep_interval());

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("HTTP server listening on {}", bind_address);

    let result = HttpServer::new(move || {
        App::new()
            .wrap(ViewerIdentity)
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(|cfg| routes::configure(cfg, &state))
    })
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?
    .run()
    .await;

    sweeper.shutdown().await;
    if let Some((pool, monitor)) = pool_handles {
        monitor.shutdown().await;
        pool.close().await;
    }
    tracing::info!("Server stopped");

    result.context("HTTP server error")
}
