use crate::clients::OcrEngine;
use crate::error::{GradingError, GradingResult};
use crate::persistence;
use db::models::assignment_submission::{self as submission, OcrStatus};
use sea_orm::{DatabaseConnection, EntityTrait};
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    /// Text was extracted and stored. Carries the number of characters.
    Extracted(usize),
    /// The submission already carries a successful extraction.
    AlreadyExtracted,
    /// Extraction failed; the truncated reason is stored on the submission.
    Failed(String),
}

/// Run OCR for one submission and store the result.
///
/// A failed extraction is recorded on the row and reported as
/// [`ExtractionOutcome::Failed`] rather than an error: re-running OCR is a manual
/// decision, so the task queue must not retry it.
pub async fn extract_submission_text(
    db: &DatabaseConnection,
    ocr: &dyn OcrEngine,
    submission_id: i64,
) -> GradingResult<ExtractionOutcome> {
    let sub = submission::Entity::find_by_id(submission_id)
        .one(db)
        .await?
        .ok_or_else(|| GradingError::DataIntegrity(format!("submission {submission_id} not found")))?;

    if sub.ocr_status == OcrStatus::Success {
        return Ok(ExtractionOutcome::AlreadyExtracted);
    }

    let Some(file_path) = sub.file_path.as_deref() else {
        let reason = "submission has no uploaded document";
        persistence::record_ocr_failure(db, submission_id, reason).await?;
        return Ok(ExtractionOutcome::Failed(reason.to_string()));
    };

    match ocr.extract_text(Path::new(file_path)).await {
        Ok(output) => {
            persistence::record_ocr_success(db, submission_id, &output.text).await?;
            let chars = output.text.chars().count();
            info!(submission_id, chars, "Extracted submission text");
            Ok(ExtractionOutcome::Extracted(chars))
        }
        Err(e) => {
            warn!(submission_id, error = %e, "Text extraction failed");
            let stored = persistence::record_ocr_failure(db, submission_id, &e.to_string()).await?;
            Ok(ExtractionOutcome::Failed(stored.ocr_error.unwrap_or_default()))
        }
    }
}
