//! Bounded-concurrency batch scheduler.
//!
//! Processes an ordered backlog of independent jobs in consecutive batches:
//! jobs within a batch run concurrently, batches run strictly one after
//! another, and an optional fixed delay paces the gap between them. Peak
//! outstanding work is therefore bounded by the batch size.
//!
//! Failure isolation is total at job granularity: a failing job becomes a
//! failed [`JobOutcome`] and neither cancels its siblings nor aborts later
//! batches. The scheduler always runs the backlog to completion and returns
//! one outcome per job in the original order.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, warn};

/// Scheduler configuration errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueueError {
    /// Concurrency must be at least 1.
    #[error("invalid concurrency: {0} (must be at least 1)")]
    InvalidConcurrency(usize),
}

/// The settled result of a single job.
///
/// Created the moment a job completes and immutable thereafter.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome<J> {
    /// The job as handed to the scheduler.
    pub job: J,

    /// Error message if the job failed; `None` on success.
    pub error: Option<String>,
}

impl<J> JobOutcome<J> {
    /// True if the job completed without error.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// A batch scheduler with a fixed concurrency ceiling and inter-batch pacing.
#[derive(Debug, Clone)]
pub struct BatchQueue {
    concurrency: usize,
    batch_delay: Duration,
}

impl BatchQueue {
    /// Creates a scheduler that runs at most `concurrency` jobs at once and
    /// waits `batch_delay` between consecutive batches.
    ///
    /// A zero concurrency is a configuration error, rejected up front.
    pub fn new(concurrency: usize, batch_delay: Duration) -> Result<Self, QueueError> {
        if concurrency == 0 {
            return Err(QueueError::InvalidConcurrency(concurrency));
        }
        Ok(Self {
            concurrency,
            batch_delay,
        })
    }

    /// Maximum number of jobs in flight at any moment.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Pause inserted between one batch settling and the next dispatching.
    pub fn batch_delay(&self) -> Duration {
        self.batch_delay
    }

    /// Runs the backlog to completion and returns outcomes in job order.
    pub async fn process<J, E, F, Fut>(&self, jobs: Vec<J>, execute: F) -> Vec<JobOutcome<J>>
    where
        J: Clone,
        E: fmt::Display,
        F: Fn(J) -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        self.process_with_progress(jobs, execute, |_| {}).await
    }

    /// Like [`BatchQueue::process`], additionally invoking `progress` with the
    /// cumulative settled-job count as each job completes.
    ///
    /// The callback is a side channel only; it has no effect on ordering or
    /// completion semantics.
    pub async fn process_with_progress<J, E, F, Fut, P>(
        &self,
        jobs: Vec<J>,
        execute: F,
        progress: P,
    ) -> Vec<JobOutcome<J>>
    where
        J: Clone,
        E: fmt::Display,
        F: Fn(J) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        P: Fn(usize),
    {
        let total = jobs.len();
        if total == 0 {
            return Vec::new();
        }

        let batch_count = total.div_ceil(self.concurrency);
        debug!(
            total,
            concurrency = self.concurrency,
            batches = batch_count,
            "processing job backlog"
        );

        let settled = AtomicUsize::new(0);
        let mut outcomes = Vec::with_capacity(total);

        for (index, batch) in jobs.chunks(self.concurrency).enumerate() {
            // Pacing applies between batches, never before the first.
            if index > 0 && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }

            debug!(batch = index + 1, size = batch.len(), "dispatching batch");

            let batch_futures = batch.iter().cloned().map(|job| {
                let fut = execute(job.clone());
                let settled = &settled;
                let progress = &progress;
                async move {
                    let error = match fut.await {
                        Ok(()) => None,
                        Err(e) => {
                            let message = e.to_string();
                            warn!(error = %message, "job failed");
                            Some(message)
                        }
                    };
                    progress(settled.fetch_add(1, Ordering::SeqCst) + 1);
                    JobOutcome { job, error }
                }
            });

            // Wait-for-all join: the batch settles only once every job has,
            // success or failure alike.
            outcomes.extend(join_all(batch_futures).await);
        }

        outcomes
    }
}
