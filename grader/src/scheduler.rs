//! Deadline timers and the beat loop that fires them.

use crate::error::{GradingError, GradingResult};
use crate::queue::{EVALUATE_ASSIGNMENT, Job, TaskQueue};
use chrono::{DateTime, Utc};
use db::models::assignment;
use db::models::scheduled_task;
use sea_orm::{ConnectionTrait, DatabaseConnection};
use serde_json::json;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Timer name for an assignment's post-deadline evaluation.
pub fn evaluation_timer_name(assignment_id: i64) -> String {
    format!("{EVALUATE_ASSIGNMENT}_{assignment_id}")
}

/// Register a one-shot timer that evaluates `assignment` at its deadline.
///
/// Fails when the deadline is not in the future, or when a timer for the assignment
/// already exists; rescheduling means cancelling first.
pub async fn schedule_assignment_evaluation<C: ConnectionTrait>(
    db: &C,
    assignment: &assignment::Model,
    now: DateTime<Utc>,
) -> GradingResult<scheduled_task::Model> {
    if assignment.deadline <= now {
        return Err(GradingError::Validation(format!(
            "deadline {} of assignment {} is not in the future",
            assignment.deadline, assignment.id
        )));
    }

    let name = evaluation_timer_name(assignment.id);
    if scheduled_task::Entity::find_by_name(db, &name).await?.is_some() {
        return Err(GradingError::Validation(format!(
            "timer {name} already exists"
        )));
    }

    let timer = scheduled_task::Entity::create_one_off(
        db,
        &name,
        EVALUATE_ASSIGNMENT,
        assignment.deadline,
        json!([assignment.id.to_string()]),
    )
    .await?;

    info!(assignment_id = assignment.id, run_at = %timer.run_at, "Scheduled evaluation");
    Ok(timer)
}

/// Remove the assignment's evaluation timer. Returns whether one existed.
pub async fn cancel_assignment_evaluation<C: ConnectionTrait>(
    db: &C,
    assignment_id: i64,
) -> GradingResult<bool> {
    let removed =
        scheduled_task::Entity::delete_by_name(db, &evaluation_timer_name(assignment_id)).await?;
    if removed > 0 {
        info!(assignment_id, "Cancelled scheduled evaluation");
    }
    Ok(removed > 0)
}

/// Polls for due timers and hands them to the task queue.
pub struct Scheduler {
    db: DatabaseConnection,
    queue: TaskQueue,
    poll_interval: Duration,
}

impl Scheduler {
    pub fn new(db: DatabaseConnection, queue: TaskQueue, poll_interval: Duration) -> Self {
        Self {
            db,
            queue,
            poll_interval,
        }
    }

    /// Dispatch every timer due at `now`. A timer is only dispatched by the poller
    /// that manages to claim it. A timer whose job is already queued or running stays
    /// enabled until a later tick. Returns the number of jobs enqueued.
    pub async fn tick(&self, now: DateTime<Utc>) -> GradingResult<usize> {
        let due = scheduled_task::Entity::find_due(&self.db, now).await?;
        let mut dispatched = 0;

        for timer in due {
            let job = match timer.args_json() {
                Ok(args) => Job::from_timer(&timer.task, &args),
                Err(e) => {
                    warn!(timer = %timer.name, error = %e, "Timer arguments are not valid JSON");
                    None
                }
            };
            if let Some(job) = job {
                if self.queue.is_in_flight(&job).await {
                    debug!(timer = %timer.name, %job, "Job still in flight; deferring timer");
                    continue;
                }
            }

            if !scheduled_task::Entity::claim(&self.db, timer.id, now).await? {
                debug!(timer = %timer.name, "Timer claimed elsewhere");
                continue;
            }

            let Some(job) = job else {
                warn!(timer = %timer.name, task = %timer.task, "Dropping timer with unknown task");
                continue;
            };

            if self.queue.enqueue(job).await.is_some() {
                dispatched += 1;
            } else {
                scheduled_task::Entity::release(&self.db, timer.id).await?;
            }
        }

        Ok(dispatched)
    }

    /// Tick every poll interval until `shutdown` flips to `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.poll_interval);
        info!(poll = ?self.poll_interval, "Scheduler started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick(Utc::now()).await {
                        error!(error = %e, "Scheduler tick failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Scheduler stopped");
    }
}
