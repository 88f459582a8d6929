//! `db_pool_connections` gauges

use prometheus::{register_int_gauge_vec, IntGaugeVec};
use sqlx::PgPool;

lazy_static::lazy_static! {
    static ref DB_POOL_CONNECTIONS: IntGaugeVec = register_int_gauge_vec!(
        "db_pool_connections",
        "Database pool connections by state (idle, active, max)",
        &["service", "state"]
    ).expect("Prometheus metrics registration should succeed at startup");
}

/// Publish the current idle/active/max counts of `pool` under `service`
pub(crate) fn update_pool_metrics(pool: &PgPool, service: &str) {
    let size = i64::from(pool.size());
    let idle = pool.num_idle() as i64;
    let max = i64::from(pool.options().get_max_connections());

    for (state, value) in [("idle", idle), ("active", size - idle), ("max", max)] {
        DB_POOL_CONNECTIONS
            .with_label_values(&[service, state])
            .set(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    #[tokio::test]
    async fn test_gauges_reflect_unconnected_pool() {
        let pool = PgPoolOptions::new()
            .max_connections(7)
            .connect_lazy("postgres://localhost/clouds")
            .unwrap();

        update_pool_metrics(&pool, "gauge-test");

        let gauge = |state: &str| {
            DB_POOL_CONNECTIONS
                .with_label_values(&["gauge-test", state])
                .get()
        };
        assert_eq!(gauge("max"), 7);
        assert_eq!(gauge("idle"), 0);
        assert_eq!(gauge("active"), 0);
    }
}
