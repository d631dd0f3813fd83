//! Database metrics collection.
//!
//! Provides functions for recording query timings and pool health.

use metrics::{counter, gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

/// Record how long a named query took and whether it failed.
pub fn record_query(query_name: &'static str, duration_secs: f64, succeeded: bool) {
    histogram!("database_query_duration_seconds", "query" => query_name).record(duration_secs);
    if !succeeded {
        counter!("database_query_errors_total", "query" => query_name).increment(1);
    }
}

/// Record database connection pool metrics.
///
/// Called whenever a job iteration opens a store scope.
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();
    let active = size.saturating_sub(idle);

    gauge!("database_connections_active").set(active as f64);
    gauge!("database_connections_idle").set(idle as f64);
    gauge!("database_connections_total").set(size as f64);
}

/// Times one query from construction until [`QueryTimer::finish`].
///
/// ```ignore
/// let timer = QueryTimer::new("delete_stale_grants");
/// let result = sqlx::query(...).execute(&pool).await;
/// timer.finish(&result);
/// ```
pub struct QueryTimer {
    query_name: &'static str,
    start: Instant,
}

impl QueryTimer {
    pub fn new(query_name: &'static str) -> Self {
        Self {
            query_name,
            start: Instant::now(),
        }
    }

    pub fn query_name(&self) -> &'static str {
        self.query_name
    }

    /// Record the elapsed duration and the outcome of `result`.
    pub fn finish<T, E>(self, result: &Result<T, E>) {
        let elapsed = self.start.elapsed();
        tracing::debug!(
            query = self.query_name,
            elapsed_ms = elapsed.as_millis() as u64,
            ok = result.is_ok(),
            "Query finished"
        );
        record_query(self.query_name, elapsed.as_secs_f64(), result.is_ok());
    }
}
