//! Job scheduler infrastructure for background tasks.
//!
//! Each registered job runs on its own tokio task: once immediately, then on
//! every tick of its interval. A shared [`CancellationToken`] stops all of
//! them; a cancelled job never waits out the rest of its interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Trait for implementing background jobs.
#[async_trait::async_trait]
pub trait Job: Send + Sync {
    /// The name of this job (used for logging).
    fn name(&self) -> &'static str;

    /// Time between runs.
    fn interval(&self) -> Duration;

    /// Execute the job. Returns Ok(()) on success, Err with message on failure.
    async fn execute(&self) -> Result<(), String>;
}

/// Background job scheduler.
pub struct JobScheduler {
    jobs: Vec<Arc<dyn Job>>,
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl JobScheduler {
    pub fn new() -> Self {
        Self::with_token(CancellationToken::new())
    }

    /// Scheduler whose jobs stop when `cancel` (or a parent of it) is cancelled.
    pub fn with_token(cancel: CancellationToken) -> Self {
        Self {
            jobs: Vec::new(),
            cancel,
            handles: Vec::new(),
        }
    }

    pub fn register<J: Job + 'static>(&mut self, job: J) {
        self.jobs.push(Arc::new(job));
    }

    /// A handle that stops the scheduler when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Start all registered jobs.
    pub fn start(&mut self) {
        info!(jobs = self.jobs.len(), "Starting job scheduler");

        for job in &self.jobs {
            let job = Arc::clone(job);
            let cancel = self.cancel.clone();
            self.handles.push(tokio::spawn(run_job(job, cancel)));
        }
    }

    /// Signals every job to stop. Returns immediately.
    pub fn shutdown(&self) {
        info!("Initiating job scheduler shutdown");
        self.cancel.cancel();
    }

    /// Waits for all job tasks to exit, giving up after `timeout`.
    pub async fn wait_for_shutdown(self, timeout: Duration) {
        let shutdown_future = async {
            for handle in self.handles {
                if let Err(e) = handle.await {
                    warn!(error = %e, "Job task panicked");
                }
            }
        };

        match tokio::time::timeout(timeout, shutdown_future).await {
            Ok(()) => info!("All jobs stopped"),
            Err(_) => warn!(timeout_ms = timeout.as_millis() as u64, "Job shutdown timed out"),
        }
    }
}

impl Default for JobScheduler {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_job(job: Arc<dyn Job>, cancel: CancellationToken) {
    let name = job.name();
    let mut interval = tokio::time::interval(job.interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(job = name, interval_secs = job.interval().as_secs(), "Job scheduled");

    loop {
        // The first tick completes immediately.
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(job = name, "Job shutting down");
                break;
            }
            _ = interval.tick() => {}
        }

        let start = std::time::Instant::now();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(job = name, "Job cancelled mid-run");
                break;
            }
            outcome = job.execute() => outcome,
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match outcome {
            Ok(()) => info!(job = name, elapsed_ms, "Job completed"),
            Err(e) => error!(job = name, elapsed_ms, error = %e, "Job failed"),
        }
    }
}
