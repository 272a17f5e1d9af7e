//! Grading Orchestrator
//!
//! Drives one assignment from "deadline passed" to "graded":
//!
//! ```text
//! AWAITING_DEADLINE → PLAGIARISM_PENDING → RAG_PENDING → FINALIZING → GRADED
//! ```
//!
//! Every step re-reads the current database state, so a run that failed halfway
//! (and is retried by the task queue) resumes where the previous attempt stopped:
//! persisted plagiarism results are not re-requested and graded submissions are not
//! scored again.

use crate::clients::{CorrectnessScorer, PlagiarismChecker, PlagiarismPayload};
use crate::error::{GradingError, GradingResult};
use crate::persistence;
use chrono::{DateTime, Utc};
use db::models::assignment::{self, AssignmentStatus, GradingStage};
use db::models::assignment_submission::{self as submission, CorrectnessStatus, SubmissionStatus};
use futures::{StreamExt, stream};
use sea_orm::{DatabaseConnection, EntityTrait};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Counters describing one orchestration run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluationSummary {
    /// Submissions selected for grading at the start of the run.
    pub selected: usize,
    /// Submissions graded with zero for plagiarism.
    pub cheaters: usize,
    /// Correctness calls that produced a score.
    pub scored: usize,
    /// Correctness calls that failed and were recorded on the row.
    pub failed: usize,
    /// Submissions whose final score was computed.
    pub finalized: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationOutcome {
    DeadlineNotReached,
    AlreadyGraded,
    NotActive,
    /// Nothing with extracted text is waiting to be graded.
    NoSubmissions,
    /// Every selected submission was resolved; the assignment is GRADED.
    Graded(EvaluationSummary),
    /// Some submissions still await a correctness score; re-trigger to finish.
    Incomplete(EvaluationSummary),
}

#[derive(Clone)]
pub struct GradingOrchestrator {
    db: DatabaseConnection,
    plagiarism: Arc<dyn PlagiarismChecker>,
    correctness: Arc<dyn CorrectnessScorer>,
    correctness_concurrency: usize,
}

impl GradingOrchestrator {
    pub fn new(
        db: DatabaseConnection,
        plagiarism: Arc<dyn PlagiarismChecker>,
        correctness: Arc<dyn CorrectnessScorer>,
        correctness_concurrency: usize,
    ) -> Self {
        Self {
            db,
            plagiarism,
            correctness,
            correctness_concurrency: correctness_concurrency.max(1),
        }
    }

    /// Evaluate an assignment whose deadline may have passed.
    ///
    /// Guard outcomes (`DeadlineNotReached`, `AlreadyGraded`, `NotActive`) never
    /// contact a remote service. Whole-batch failures (the plagiarism call, the
    /// database) are returned as errors; per-submission correctness failures are
    /// recorded on the submission and reported through `Incomplete`.
    pub async fn evaluate(
        &self,
        assignment_id: i64,
        now: DateTime<Utc>,
    ) -> GradingResult<EvaluationOutcome> {
        let assignment = assignment::Entity::find_by_id(assignment_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| {
                GradingError::DataIntegrity(format!("assignment {assignment_id} not found"))
            })?;

        if !assignment.is_deadline_passed(now) {
            debug!(assignment_id, deadline = %assignment.deadline, "Deadline not reached");
            return Ok(EvaluationOutcome::DeadlineNotReached);
        }
        match assignment.status {
            AssignmentStatus::Graded => return Ok(EvaluationOutcome::AlreadyGraded),
            AssignmentStatus::Draft => return Ok(EvaluationOutcome::NotActive),
            AssignmentStatus::Active => {}
        }

        let selected = submission::Entity::find_gradable(&self.db, assignment_id).await?;
        if selected.is_empty() {
            return self.resume_finalization(assignment_id).await;
        }

        let mut summary = EvaluationSummary {
            selected: selected.len(),
            ..Default::default()
        };

        self.enter_stage(assignment_id, GradingStage::PlagiarismPending).await?;
        self.run_plagiarism(&assignment, &selected).await?;
        summary.cheaters = persistence::short_circuit_cheaters(&self.db, assignment_id)
            .await?
            .len();

        self.enter_stage(assignment_id, GradingStage::RagPending).await?;
        let (scored, failed) = self.run_correctness(&assignment).await?;
        summary.scored = scored;
        summary.failed = failed;

        self.enter_stage(assignment_id, GradingStage::Finalizing).await?;
        summary.finalized = persistence::finalize_scores(&self.db, assignment_id).await?;

        let unresolved = submission::Entity::find_gradable(&self.db, assignment_id)
            .await?
            .len();
        if unresolved > 0 {
            self.enter_stage(assignment_id, GradingStage::RagPending).await?;
            warn!(
                assignment_id,
                unresolved, "Grading incomplete; submissions still await a correctness score"
            );
            return Ok(EvaluationOutcome::Incomplete(summary));
        }

        persistence::mark_assignment_graded(&self.db, assignment_id).await?;
        info!(
            assignment_id,
            selected = summary.selected,
            cheaters = summary.cheaters,
            finalized = summary.finalized,
            "Assignment graded"
        );
        Ok(EvaluationOutcome::Graded(summary))
    }

    /// Nothing is left to score. An earlier attempt may still have stopped after
    /// scoring but before finalizing, or before marking the assignment GRADED.
    async fn resume_finalization(&self, assignment_id: i64) -> GradingResult<EvaluationOutcome> {
        let finalized = persistence::finalize_scores(&self.db, assignment_id).await?;
        let resolved = submission::Entity::find_by_status(
            &self.db,
            assignment_id,
            SubmissionStatus::Graded,
        )
        .await?;
        if resolved.is_empty() {
            info!(assignment_id, "No submissions with extracted text to grade");
            return Ok(EvaluationOutcome::NoSubmissions);
        }

        self.enter_stage(assignment_id, GradingStage::Finalizing).await?;
        persistence::mark_assignment_graded(&self.db, assignment_id).await?;
        info!(assignment_id, finalized, "Resumed grading after an interrupted run");
        Ok(EvaluationOutcome::Graded(EvaluationSummary {
            finalized,
            ..Default::default()
        }))
    }

    async fn enter_stage(&self, assignment_id: i64, stage: GradingStage) -> GradingResult<()> {
        assignment::Entity::set_grading_stage(&self.db, assignment_id, stage).await?;
        debug!(assignment_id, %stage, "Entered grading stage");
        Ok(())
    }

    /// Compare the selected submissions and persist the derived scores. Skipped when a
    /// previous attempt already stored a score for every one of them.
    async fn run_plagiarism(
        &self,
        assignment: &assignment::Model,
        selected: &[submission::Model],
    ) -> GradingResult<()> {
        if selected.iter().all(|s| s.plagiarism_score.is_some()) {
            debug!(assignment_id = assignment.id, "Plagiarism results already stored");
            return Ok(());
        }

        let payload = PlagiarismPayload::build(assignment, selected);
        let response = self.plagiarism.check(&payload).await?;
        persistence::save_plagiarism_results(&self.db, assignment.id, &response).await?;
        persistence::fill_unchecked_plagiarism(&self.db, assignment.id).await?;
        Ok(())
    }

    /// Score every remaining submission independently. Returns `(scored, failed)`.
    async fn run_correctness(&self, assignment: &assignment::Model) -> GradingResult<(usize, usize)> {
        let pending: Vec<submission::Model> =
            submission::Entity::find_gradable(&self.db, assignment.id)
                .await?
                .into_iter()
                .filter(|s| s.plagiarism_score.is_some_and(|p| p > 0.0))
                .collect();
        if pending.is_empty() {
            return Ok((0, 0));
        }

        let collection = assignment.rag_collection.as_deref().ok_or_else(|| {
            GradingError::Validation(format!(
                "assignment {} has no trained collection",
                assignment.id
            ))
        })?;

        let jobs: Vec<_> = pending
            .into_iter()
            .map(|s| {
                let this = self.clone();
                let collection = collection.to_string();
                async move { this.score_one(&collection, s).await }
            })
            .collect();

        let results: Vec<GradingResult<bool>> = stream::iter(jobs)
            .buffer_unordered(self.correctness_concurrency)
            .collect()
            .await;

        let mut scored = 0;
        let mut failed = 0;
        for result in results {
            if result? {
                scored += 1;
            } else {
                failed += 1;
            }
        }
        Ok((scored, failed))
    }

    /// Score one submission and record the outcome. `Ok(false)` means the failure was
    /// recorded on the row; only database errors are returned.
    async fn score_one(&self, collection: &str, sub: submission::Model) -> GradingResult<bool> {
        let text = sub.extracted_text.as_deref().unwrap_or_default();
        match self.correctness.score(collection, text).await {
            Ok(score) => {
                persistence::record_correctness_success(&self.db, sub.id, score).await?;
                debug!(submission_id = sub.id, score, "Correctness scored");
                Ok(true)
            }
            Err(e) => {
                let status = match e {
                    GradingError::Transport { .. } => CorrectnessStatus::Error,
                    _ => CorrectnessStatus::Failed,
                };
                warn!(submission_id = sub.id, %status, error = %e, "Correctness scoring failed");
                persistence::record_correctness_failure(&self.db, sub.id, status, &e.to_string())
                    .await?;
                Ok(false)
            }
        }
    }
}
