//! Prometheus exporter setup.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

/// Job durations range from milliseconds to several minutes for a large
/// orphan sweep.
const JOB_DURATION_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0, 900.0];

/// Install the global recorder and serve `/metrics` on `addr`.
///
/// Must be called from within the Tokio runtime, once, before any job runs.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .set_buckets(JOB_DURATION_BUCKETS)?
        .with_http_listener(addr)
        .install()
}
