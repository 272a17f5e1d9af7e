//! Background task queue.
//!
//! Jobs run on a bounded pool of slots (see [`SlotQueue`]); jobs that cannot start
//! immediately wait in FIFO order. Each job is keyed, and a key that is already
//! queued or running is refused, so a trigger fired twice grades an assignment once.

mod retry;
mod slots;

pub use retry::RetryPolicy;
pub use slots::{QueueStats, SlotQueue};

use crate::error::GradingResult;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Timer task name for post-deadline evaluation.
pub const EVALUATE_ASSIGNMENT: &str = "evaluate_assignment";
pub const EXTRACT_SUBMISSION_TEXT: &str = "extract_submission_text";
pub const TRAIN_COLLECTION: &str = "train_collection";
pub const DELETE_COLLECTION: &str = "delete_collection";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum Job {
    EvaluateAssignment { assignment_id: i64 },
    ExtractSubmissionText { submission_id: i64 },
    TrainCollection { assignment_id: i64 },
    DeleteCollection { assignment_id: i64 },
}

impl Job {
    pub fn name(&self) -> &'static str {
        match self {
            Job::EvaluateAssignment { .. } => EVALUATE_ASSIGNMENT,
            Job::ExtractSubmissionText { .. } => EXTRACT_SUBMISSION_TEXT,
            Job::TrainCollection { .. } => TRAIN_COLLECTION,
            Job::DeleteCollection { .. } => DELETE_COLLECTION,
        }
    }

    /// Deduplication key.
    pub fn key(&self) -> String {
        let id = match self {
            Job::EvaluateAssignment { assignment_id }
            | Job::TrainCollection { assignment_id }
            | Job::DeleteCollection { assignment_id } => assignment_id,
            Job::ExtractSubmissionText { submission_id } => submission_id,
        };
        format!("{}:{id}", self.name())
    }

    /// Rebuild a job from a timer record's task name and argument list. The id may be
    /// stored as a number or a numeric string.
    pub fn from_timer(task: &str, args: &[Value]) -> Option<Job> {
        let id = match args.first()? {
            Value::Number(n) => n.as_i64()?,
            Value::String(s) => s.trim().parse().ok()?,
            _ => return None,
        };
        match task {
            EVALUATE_ASSIGNMENT => Some(Job::EvaluateAssignment { assignment_id: id }),
            EXTRACT_SUBMISSION_TEXT => Some(Job::ExtractSubmissionText { submission_id: id }),
            TRAIN_COLLECTION => Some(Job::TrainCollection { assignment_id: id }),
            DELETE_COLLECTION => Some(Job::DeleteCollection { assignment_id: id }),
            _ => None,
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Executes jobs taken off the queue.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: Job) -> GradingResult<()>;
}

#[derive(Clone)]
pub struct TaskQueue {
    slots: Arc<Mutex<SlotQueue>>,
    in_flight: Arc<Mutex<HashSet<String>>>,
    handler: Arc<dyn JobHandler>,
    retry: RetryPolicy,
}

impl TaskQueue {
    pub fn new(handler: Arc<dyn JobHandler>, max_concurrent: usize, retry: RetryPolicy) -> Self {
        Self {
            slots: Arc::new(Mutex::new(SlotQueue::new(max_concurrent))),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            handler,
            retry,
        }
    }

    /// Queue `job` for execution. Returns `None` when a job with the same key is
    /// already queued or running.
    pub async fn enqueue(&self, job: Job) -> Option<JoinHandle<()>> {
        let key = job.key();
        if !self.in_flight.lock().await.insert(key.clone()) {
            warn!(%job, "Job already queued or running; ignoring duplicate");
            return None;
        }

        let queue = self.clone();
        Some(tokio::spawn(async move {
            queue.run(job).await;
            queue.in_flight.lock().await.remove(&key);
        }))
    }

    pub async fn stats(&self) -> QueueStats {
        self.slots.lock().await.stats()
    }

    pub async fn is_in_flight(&self, job: &Job) -> bool {
        self.in_flight.lock().await.contains(&job.key())
    }

    /// Run a job to completion, retrying retryable failures. The slot is given back
    /// while waiting out a backoff.
    async fn run(&self, job: Job) {
        let mut attempt = 1;
        loop {
            let result = self.run_in_slot(job).await;
            match result {
                Ok(()) => {
                    info!(%job, attempt, "Job finished");
                    return;
                }
                Err(e) if self.retry.should_retry(attempt, &e) => {
                    let delay = self.retry.backoff(attempt);
                    warn!(%job, attempt, error = %e, ?delay, "Job failed; retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(%job, attempt, error = %e, "Job failed");
                    return;
                }
            }
        }
    }

    async fn run_in_slot(&self, job: Job) -> GradingResult<()> {
        let maybe_notify = {
            let mut slots = self.slots.lock().await;
            slots.try_acquire_slot()
        };

        // Wait outside the mutex.
        if let Some(notify) = maybe_notify {
            notify.notified().await;
        }

        let result = self.handler.handle(job).await;

        {
            let mut slots = self.slots.lock().await;
            slots.release_slot();
        }
        result
    }
}
