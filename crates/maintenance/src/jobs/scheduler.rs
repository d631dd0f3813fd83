//! Job scheduler infrastructure for the maintenance jobs.
//!
//! Every registered job gets its own long-lived task. The task waits one
//! interval, opens a fresh store scope, runs the job in a separate task so a
//! panic is contained, then waits again. Failed iterations are retried with an
//! exponential backoff that never exceeds the job's own interval.

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use domain::stores::StoreProvider;
use domain::Clock;
use metrics::{counter, histogram};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

use super::job::{JobContext, JobError, JobOutcome, MaintenanceJob};

/// Delay policy after failed iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    initial: Duration,
}

impl RetryPolicy {
    pub fn new(initial: Duration) -> Self {
        Self { initial }
    }

    /// Wait before the next attempt after `consecutive_failures` failures in a row.
    ///
    /// Doubles from the initial delay and is capped at `interval`.
    pub fn delay_after(&self, consecutive_failures: u32, interval: Duration) -> Duration {
        if consecutive_failures == 0 {
            return interval;
        }
        let exponent = (consecutive_failures - 1).min(16);
        self.initial
            .saturating_mul(1u32 << exponent)
            .min(interval)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

/// Background job scheduler.
pub struct JobScheduler {
    jobs: Vec<Arc<MaintenanceJob>>,
    stores: Arc<dyn StoreProvider>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    shutdown: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl JobScheduler {
    /// Create a new job scheduler.
    pub fn new(stores: Arc<dyn StoreProvider>, clock: Arc<dyn Clock>, retry: RetryPolicy) -> Self {
        Self {
            jobs: Vec::new(),
            stores,
            clock,
            retry,
            shutdown: CancellationToken::new(),
            handles: Vec::new(),
        }
    }

    /// Register a job with the scheduler.
    pub fn register(&mut self, job: MaintenanceJob) {
        self.jobs.push(Arc::new(job));
    }

    /// Names of the registered jobs, in registration order.
    pub fn job_names(&self) -> Vec<&'static str> {
        self.jobs.iter().map(|job| job.name()).collect()
    }

    /// Token cancelled when shutdown is requested.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Start all registered jobs.
    pub fn start(&mut self) {
        info!("Starting job scheduler with {} jobs", self.jobs.len());

        for job in &self.jobs {
            let span = info_span!("job", job = job.name());
            let runner = JobRunner {
                job: Arc::clone(job),
                stores: Arc::clone(&self.stores),
                clock: Arc::clone(&self.clock),
                retry: self.retry,
                shutdown: self.shutdown.clone(),
            };

            let handle = tokio::spawn(runner.run().instrument(span));
            self.handles.push(handle);
        }
    }

    /// Initiate graceful shutdown of all jobs.
    /// Returns immediately after signaling shutdown.
    pub fn shutdown(&self) {
        info!("Initiating job scheduler shutdown");
        self.shutdown.cancel();
    }

    /// Wait for all jobs to complete with timeout.
    pub async fn wait_for_shutdown(self, timeout: Duration) {
        info!("Waiting for jobs to complete (timeout: {:?})", timeout);

        let shutdown_future = async {
            for handle in self.handles {
                if let Err(e) = handle.await {
                    warn!("Job task panicked: {}", e);
                }
            }
        };

        match tokio::time::timeout(timeout, shutdown_future).await {
            Ok(()) => info!("All jobs completed gracefully"),
            Err(_) => warn!("Job shutdown timed out after {:?}", timeout),
        }
    }
}

/// Loop state of one registered job.
struct JobRunner {
    job: Arc<MaintenanceJob>,
    stores: Arc<dyn StoreProvider>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    shutdown: CancellationToken,
}

impl JobRunner {
    async fn run(self) {
        let name = self.job.name();
        let interval = self.job.interval();
        let mut consecutive_failures: u32 = 0;

        info!(interval_secs = interval.as_secs(), "Job scheduled");

        loop {
            let delay = self.retry.delay_after(consecutive_failures, interval);

            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }

            if self.shutdown.is_cancelled() {
                break;
            }

            let start = Instant::now();
            info!("Job starting");

            let result = self.execute_once().await;
            let elapsed = start.elapsed();
            histogram!("maintenance_job_duration_seconds", "job" => name)
                .record(elapsed.as_secs_f64());

            match result {
                Ok(outcome) => {
                    consecutive_failures = 0;
                    counter!("maintenance_job_runs_total", "job" => name, "outcome" => "success")
                        .increment(1);
                    counter!("maintenance_rows_affected_total", "job" => name)
                        .increment(outcome.items_affected());
                    info!(
                        elapsed_ms = elapsed.as_millis(),
                        outcome = %outcome,
                        "Job completed successfully"
                    );
                }
                Err(JobError::Cancelled) => {
                    counter!("maintenance_job_runs_total", "job" => name, "outcome" => "cancelled")
                        .increment(1);
                    info!(elapsed_ms = elapsed.as_millis(), "Job cancelled mid-run");
                    break;
                }
                Err(e) => {
                    consecutive_failures = consecutive_failures.saturating_add(1);
                    let retry_in = self.retry.delay_after(consecutive_failures, interval);
                    counter!("maintenance_job_runs_total", "job" => name, "outcome" => "failure")
                        .increment(1);
                    error!(
                        elapsed_ms = elapsed.as_millis(),
                        error = %e,
                        consecutive_failures = consecutive_failures,
                        retry_in_secs = retry_in.as_secs(),
                        "Job failed"
                    );
                }
            }
        }

        info!("Job shutting down");
    }

    /// One iteration in its own task with its own store scope.
    async fn execute_once(&self) -> Result<JobOutcome, JobError> {
        let ctx = JobContext::new(
            self.stores.open_scope(),
            Arc::clone(&self.clock),
            self.shutdown.clone(),
        );
        let job = Arc::clone(&self.job);
        let span = info_span!("job_run");

        let handle = tokio::spawn(async move { job.execute(&ctx).await }.instrument(span));

        match handle.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(JobError::Panicked(panic_message(e.into_panic()))),
            Err(e) => Err(JobError::Panicked(e.to_string())),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
