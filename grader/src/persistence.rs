//! Result persistence.
//!
//! Every write here is a short lock → read → mutate → write → commit unit. No
//! function in this module performs network I/O, so no row lock is ever held
//! across a call to a remote service.

use crate::clients::PlagiarismResponse;
use crate::error::{GradingError, GradingResult};
use crate::scoring::{self, MAX_SCORE};
use chrono::Utc;
use db::models::assignment::{self, AssignmentStatus, GradingStage};
use db::models::assignment_submission::{
    self as submission, CorrectnessStatus, OcrStatus, SubmissionStatus,
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QuerySelect, TransactionTrait,
};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Longest error text stored on a submission row.
pub const MAX_ERROR_CHARS: usize = 500;

/// Tag stored when the comparison service produced no result for a submission.
pub const UNCHECKED_TAG: &str = "UNCHECKED";

/// Cut `message` to at most [`MAX_ERROR_CHARS`] characters.
pub fn truncate_error(message: &str) -> String {
    match message.char_indices().nth(MAX_ERROR_CHARS) {
        Some((idx, _)) => message[..idx].to_string(),
        None => message.to_string(),
    }
}

/// A validated row of a plagiarism response.
#[derive(Debug, Clone, PartialEq)]
pub struct PlagiarismOutcome {
    pub submission_id: i64,
    pub penalty: f64,
    pub similarity: f64,
    pub status: Option<String>,
}

impl PlagiarismOutcome {
    pub fn score(&self) -> f64 {
        scoring::plagiarism_score(self.penalty, self.status.as_deref())
    }
}

/// Read a number that may arrive as a JSON number or a numeric string.
/// Anything else reads as 0.0.
fn lenient_f64(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Validate one result row. Rows without a usable submission id yield `None`.
pub fn parse_plagiarism_result(row: &Value) -> Option<PlagiarismOutcome> {
    let submission_id = match row.get("assignment_id")? {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };

    Some(PlagiarismOutcome {
        submission_id,
        penalty: lenient_f64(row.get("plagiarism_score")),
        similarity: lenient_f64(row.get("max_similarity")).clamp(0.0, 1.0),
        status: row.get("status").and_then(Value::as_str).map(str::to_string),
    })
}

/// How many plagiarism rows were written and how many were dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistReport {
    pub applied: usize,
    pub skipped: usize,
}

/// Apply a plagiarism batch in a single transaction.
///
/// Rows with an unparsable id, an unknown submission, or a submission from another
/// assignment are skipped and logged; they never abort the batch.
pub async fn save_plagiarism_results(
    db: &DatabaseConnection,
    assignment_id: i64,
    response: &PlagiarismResponse,
) -> GradingResult<PersistReport> {
    if !response.success {
        return Err(GradingError::Validation(
            "refusing to persist an unsuccessful plagiarism response".into(),
        ));
    }

    let mut report = PersistReport::default();
    let txn = db.begin().await?;

    for row in &response.results {
        let Some(outcome) = parse_plagiarism_result(row) else {
            warn!(%row, "Skipping plagiarism result without a usable submission id");
            report.skipped += 1;
            continue;
        };

        let found = submission::Entity::find_by_id(outcome.submission_id)
            .lock_exclusive()
            .one(&txn)
            .await?;
        let Some(model) = found.filter(|m| m.assignment_id == assignment_id) else {
            warn!(
                submission_id = outcome.submission_id,
                assignment_id, "Skipping plagiarism result for unknown submission"
            );
            report.skipped += 1;
            continue;
        };

        let score = outcome.score();
        let mut am = model.into_active_model();
        am.plagiarism_similarity = Set(Some(outcome.similarity));
        am.plagiarism_score = Set(Some(score));
        am.plagiarism_status = Set(outcome.status.clone());
        am.marks = Set(Some(score));
        am.updated_at = Set(Utc::now());
        am.update(&txn).await?;
        report.applied += 1;
    }

    txn.commit().await?;
    info!(
        assignment_id,
        applied = report.applied,
        skipped = report.skipped,
        "Persisted plagiarism results"
    );
    Ok(report)
}

/// Give every gradable submission the service did not score the maximum
/// plagiarism score, tagged [`UNCHECKED_TAG`]. Returns the ids touched.
pub async fn fill_unchecked_plagiarism(
    db: &DatabaseConnection,
    assignment_id: i64,
) -> GradingResult<Vec<i64>> {
    let txn = db.begin().await?;
    let unscored = submission::Entity::find()
        .filter(submission::Column::AssignmentId.eq(assignment_id))
        .filter(submission::Column::Status.eq(SubmissionStatus::Submitted))
        .filter(submission::Column::PlagiarismScore.is_null())
        .lock_exclusive()
        .all(&txn)
        .await?;

    let mut touched = Vec::new();
    for model in unscored.into_iter().filter(submission::Model::has_extracted_text) {
        touched.push(model.id);
        let mut am = model.into_active_model();
        am.plagiarism_similarity = Set(Some(0.0));
        am.plagiarism_score = Set(Some(MAX_SCORE));
        am.plagiarism_status = Set(Some(UNCHECKED_TAG.to_string()));
        am.marks = Set(Some(MAX_SCORE));
        am.updated_at = Set(Utc::now());
        am.update(&txn).await?;
    }

    txn.commit().await?;
    if !touched.is_empty() {
        debug!(assignment_id, count = touched.len(), "Marked submissions as unchecked");
    }
    Ok(touched)
}

/// Lock one submission, let `mutate` edit it, and commit.
///
/// `mutate` returns `false` to leave the row untouched (for instance when a
/// concurrent writer already moved it on).
async fn update_submission<F>(
    db: &DatabaseConnection,
    submission_id: i64,
    mutate: F,
) -> GradingResult<submission::Model>
where
    F: FnOnce(&submission::Model, &mut submission::ActiveModel) -> bool,
{
    let txn = db.begin().await?;
    let model = submission::Entity::find_by_id(submission_id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or_else(|| GradingError::DataIntegrity(format!("submission {submission_id} not found")))?;

    let mut am = model.clone().into_active_model();
    if !mutate(&model, &mut am) {
        txn.commit().await?;
        return Ok(model);
    }
    am.updated_at = Set(Utc::now());
    let updated = am.update(&txn).await?;
    txn.commit().await?;
    Ok(updated)
}

pub async fn record_ocr_success(
    db: &DatabaseConnection,
    submission_id: i64,
    text: &str,
) -> GradingResult<submission::Model> {
    update_submission(db, submission_id, |_, am| {
        am.extracted_text = Set(Some(text.to_string()));
        am.ocr_status = Set(OcrStatus::Success);
        am.ocr_error = Set(None);
        true
    })
    .await
}

pub async fn record_ocr_failure(
    db: &DatabaseConnection,
    submission_id: i64,
    error: &str,
) -> GradingResult<submission::Model> {
    update_submission(db, submission_id, |_, am| {
        am.ocr_status = Set(OcrStatus::Failed);
        am.ocr_error = Set(Some(truncate_error(error)));
        true
    })
    .await
}

/// Store a correctness score and move the submission to `processed_rag`.
/// A submission that is no longer `submitted` is left as it is.
pub async fn record_correctness_success(
    db: &DatabaseConnection,
    submission_id: i64,
    score: f64,
) -> GradingResult<submission::Model> {
    update_submission(db, submission_id, |current, am| {
        if current.status != SubmissionStatus::Submitted {
            return false;
        }
        am.correctness_score = Set(Some(score));
        am.correctness_status = Set(CorrectnessStatus::Graded);
        am.correctness_error = Set(None);
        am.marks = Set(Some(score));
        am.status = Set(SubmissionStatus::ProcessedRag);
        true
    })
    .await
}

/// Record a failed correctness attempt. The lifecycle status is not touched, so the
/// submission is picked up again by the next orchestration run.
pub async fn record_correctness_failure(
    db: &DatabaseConnection,
    submission_id: i64,
    status: CorrectnessStatus,
    error: &str,
) -> GradingResult<submission::Model> {
    update_submission(db, submission_id, |_, am| {
        am.correctness_status = Set(status);
        am.correctness_error = Set(Some(truncate_error(error)));
        true
    })
    .await
}

/// Grade every still-submitted cheat case of an assignment with a final score of 0.
/// Returns the ids graded.
pub async fn short_circuit_cheaters(
    db: &DatabaseConnection,
    assignment_id: i64,
) -> GradingResult<Vec<i64>> {
    let txn = db.begin().await?;
    let cheaters = submission::Entity::find()
        .filter(submission::Column::AssignmentId.eq(assignment_id))
        .filter(submission::Column::Status.eq(SubmissionStatus::Submitted))
        .filter(submission::Column::PlagiarismScore.lte(0.0))
        .lock_exclusive()
        .all(&txn)
        .await?;

    let mut graded = Vec::with_capacity(cheaters.len());
    for model in cheaters {
        graded.push(model.id);
        let mut am = model.into_active_model();
        am.marks = Set(Some(0.0));
        am.final_score = Set(Some(0.0));
        am.status = Set(SubmissionStatus::Graded);
        am.updated_at = Set(Utc::now());
        am.update(&txn).await?;
    }

    txn.commit().await?;
    if !graded.is_empty() {
        info!(assignment_id, count = graded.len(), "Graded plagiarism cases with zero");
    }
    Ok(graded)
}

/// Compute the final score of every `processed_rag` submission and mark it graded.
/// Returns the number of submissions finalized.
pub async fn finalize_scores(db: &DatabaseConnection, assignment_id: i64) -> GradingResult<usize> {
    let txn = db.begin().await?;
    let processed = submission::Entity::find()
        .filter(submission::Column::AssignmentId.eq(assignment_id))
        .filter(submission::Column::Status.eq(SubmissionStatus::ProcessedRag))
        .lock_exclusive()
        .all(&txn)
        .await?;

    let count = processed.len();
    for model in processed {
        let plagiarism = model.plagiarism_score.unwrap_or(0.0);
        let correctness = model.correctness_score.unwrap_or(0.0);
        let final_score = scoring::final_score(plagiarism, correctness);

        let mut am = model.into_active_model();
        am.final_score = Set(Some(final_score));
        am.marks = Set(Some(final_score));
        am.status = Set(SubmissionStatus::Graded);
        am.updated_at = Set(Utc::now());
        am.update(&txn).await?;
    }

    txn.commit().await?;
    Ok(count)
}

/// Move an ACTIVE assignment to GRADED. A no-op when it already is GRADED.
pub async fn mark_assignment_graded(
    db: &DatabaseConnection,
    assignment_id: i64,
) -> GradingResult<assignment::Model> {
    let txn = db.begin().await?;
    let model = assignment::Entity::find_by_id(assignment_id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or_else(|| GradingError::DataIntegrity(format!("assignment {assignment_id} not found")))?;

    if model.status == AssignmentStatus::Graded {
        txn.commit().await?;
        return Ok(model);
    }
    if !model.status.can_transition_to(AssignmentStatus::Graded) {
        return Err(GradingError::Validation(format!(
            "assignment {assignment_id} is {} and cannot be graded",
            model.status
        )));
    }

    let now = Utc::now();
    let mut am = model.into_active_model();
    am.status = Set(AssignmentStatus::Graded);
    am.grading_stage = Set(GradingStage::Graded);
    am.graded_at = Set(Some(now));
    am.updated_at = Set(now);
    let updated = am.update(&txn).await?;
    txn.commit().await?;
    Ok(updated)
}
