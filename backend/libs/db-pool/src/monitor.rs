//! Periodic refresh of the pool gauges

use crate::metrics::update_pool_metrics;
use sqlx::PgPool;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Handle to the gauge refresh task of one pool.
///
/// The task stops on [`PoolMonitor::shutdown`] or as soon as the pool is
/// closed, whichever comes first.
pub struct PoolMonitor {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PoolMonitor {
    /// Publish the gauges now, then every `interval`.
    pub fn start(pool: PgPool, service: impl Into<String>, interval: Duration) -> Self {
        let service = service.into();
        let period = interval.max(Duration::from_millis(1));
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let closed = pool.close_event();
            tokio::pin!(closed);

            loop {
                tokio::select! {
                    _ = &mut closed => {
                        debug!(service = %service, "Pool closed, gauge refresh stopped");
                        break;
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => update_pool_metrics(&pool, &service),
                }
            }
        });

        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Stop the refresh loop and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Pool monitor task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
