//! Background job dispatch.
//!
//! ```text
//! WorkerPool
//!   ├─ trigger()            // POST /api/worker: reserve a slot, claim one job, spawn it
//!   └─ run() (supervisor)
//!        ├─ poll tick       // claim while slots are free
//!        └─ reap tick       // requeue or fail jobs stuck in processing
//! ```
//!
//! Slots are semaphore permits, so at most `concurrency` jobs are in flight.
//! Job tasks are tracked so shutdown can wait for them.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::config::WorkerConfig;
use crate::database::models::{Job, RecoveredJobs};
use crate::database::{DatabaseError, Store};
use crate::services::jobs::JobProcessor;

/// Result of a manual dispatch request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Started(Uuid),
    NoWork,
    /// Every slot is taken; nothing was claimed
    Busy,
}

pub struct WorkerPool {
    store: Arc<dyn Store>,
    processor: Arc<JobProcessor>,
    slots: Arc<Semaphore>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
    config: WorkerConfig,
}

impl WorkerPool {
    pub fn new(
        store: Arc<dyn Store>,
        processor: Arc<JobProcessor>,
        config: &WorkerConfig,
        shutdown: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            processor,
            slots: Arc::new(Semaphore::new(config.concurrency.max(1))),
            tracker: TaskTracker::new(),
            shutdown,
            config: config.clone(),
        })
    }

    /// Claim the oldest pending job and process it in the background
    pub async fn trigger(&self) -> Result<TriggerOutcome, DatabaseError> {
        if self.shutdown.is_cancelled() {
            return Ok(TriggerOutcome::Busy);
        }
        let Ok(slot) = self.slots.clone().try_acquire_owned() else {
            return Ok(TriggerOutcome::Busy);
        };

        match self.store.claim_next_job().await? {
            Some(job) => {
                let id = job.id;
                self.dispatch(job, slot);
                Ok(TriggerOutcome::Started(id))
            }
            None => Ok(TriggerOutcome::NoWork),
        }
    }

    /// Spawn the supervisor loop
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let pool = Arc::clone(self);
        tokio::spawn(async move { pool.run().await })
    }

    /// Jobs currently being processed
    pub fn in_flight(&self) -> usize {
        self.config.concurrency.max(1) - self.slots.available_permits()
    }

    /// Stop claiming, then wait up to the grace period for in-flight jobs
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.tracker.close();
        let grace = self.config.shutdown_grace();
        if tokio::time::timeout(grace, self.tracker.wait()).await.is_err() {
            tracing::warn!(
                in_flight = self.in_flight(),
                "Worker shutdown grace period elapsed; unfinished jobs will be recovered on next start"
            );
        } else {
            tracing::info!("Worker pool stopped");
        }
    }

    async fn run(self: Arc<Self>) {
        let poll_interval = self.config.poll_interval();
        let mut poll = tokio::time::interval(poll_interval.unwrap_or(self.config.reap_interval()));
        let mut reap = tokio::time::interval(self.config.reap_interval());

        tracing::info!(
            concurrency = self.config.concurrency,
            polling = poll_interval.is_some(),
            "Worker pool started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = poll.tick(), if poll_interval.is_some() => self.drain_pending().await,
                _ = reap.tick() => {
                    if let Err(e) = self.recover_stale().await {
                        tracing::warn!("Stale job recovery failed: {}", e);
                    }
                }
            }
        }
    }

    /// Claim jobs until the queue is empty or every slot is busy
    async fn drain_pending(&self) {
        while !self.shutdown.is_cancelled() {
            let Ok(slot) = self.slots.clone().try_acquire_owned() else {
                return;
            };
            match self.store.claim_next_job().await {
                Ok(Some(job)) => self.dispatch(job, slot),
                Ok(None) => return,
                Err(e) => {
                    tracing::warn!("Failed to claim pending job: {}", e);
                    return;
                }
            }
        }
    }

    async fn recover_stale(&self) -> Result<RecoveredJobs, DatabaseError> {
        let stale_after = chrono::Duration::from_std(self.config.stale_after())
            .unwrap_or_else(|_| chrono::Duration::seconds(i64::from(u32::MAX)));
        self.store
            .recover_stale_jobs(Utc::now() - stale_after, self.config.max_attempts)
            .await
    }

    fn dispatch(&self, job: Job, slot: OwnedSemaphorePermit) {
        tracing::info!(job_id = %job.id, attempt = job.attempts, "Job started");
        let processor = Arc::clone(&self.processor);
        self.tracker.spawn(async move {
            let _slot = slot;
            processor.process(job).await
        });
    }
}
