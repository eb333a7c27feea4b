//! Fixed-interval scheduling of a single job
//!
//! The first run starts immediately. Each later run starts one interval
//! after the previous run *started*; if a run overruns the interval the
//! next one starts as soon as it finishes. Runs never overlap and missed
//! slots are not made up.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info};

use crate::error::Result;

/// Shutdown is checked at least this often while waiting.
const SLEEP_SLICE: Duration = Duration::from_secs(1);

/// Work performed on every scheduler tick
#[async_trait]
pub trait Job: Send {
    /// Run once. Errors are logged by the scheduler and do not stop it.
    async fn run(&mut self) -> Result<()>;

    fn name(&self) -> &str {
        "job"
    }
}

pub struct Scheduler {
    interval: Duration,
    shutdown: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share an existing shutdown flag (e.g. one set by signal handlers)
    pub fn with_shutdown(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Run `job` until shutdown is requested; returns the number of runs
    ///
    /// An in-flight run always completes before this returns.
    pub async fn run<J: Job + ?Sized>(&self, job: &mut J) -> u64 {
        info!(
            "Scheduler started for {} (interval: {})",
            job.name(),
            humantime::format_duration(self.interval)
        );

        let mut runs = 0;
        while !self.shutdown_requested() {
            let started = Instant::now();
            runs += 1;

            if let Err(e) = job.run().await {
                error!("{} run {} failed: {}", job.name(), runs, e);
            }

            let next = started + self.interval;
            if Instant::now() >= next {
                debug!("Run overran the interval; starting the next one now");
            }

            if !self.sleep_until(next).await {
                break;
            }
        }

        info!("Scheduler stopped after {} run(s)", runs);
        runs
    }

    /// Run `job` exactly once, propagating its error
    pub async fn run_once<J: Job + ?Sized>(&self, job: &mut J) -> Result<()> {
        job.run().await
    }

    /// Sleep until `deadline` in short slices; false if shutdown was
    /// requested first.
    async fn sleep_until(&self, deadline: Instant) -> bool {
        loop {
            if self.shutdown_requested() {
                return false;
            }

            let now = Instant::now();
            if now >= deadline {
                return true;
            }

            sleep(SLEEP_SLICE.min(deadline - now)).await;
        }
    }
}
