use super::common::{enqueue_response, error_response, not_found};
use crate::state::AppState;
use axum::{
    Router,
    extract::{Path, State},
    response::Response,
    routing::post,
};
use db::models::assignment_submission;
use grader::Job;
use sea_orm::EntityTrait;

pub fn submission_routes() -> Router<AppState> {
    Router::new().route("/{submission_id}/ocr", post(extract_text))
}

/// POST /api/submissions/{submission_id}/ocr
///
/// Queues text extraction for a submission. Already extracted submissions are left
/// as they are when the job runs.
///
/// - `202 Accepted` when queued
/// - `404 Not Found` when the submission does not exist
/// - `409 Conflict` when extraction for this submission is already in flight
async fn extract_text(State(state): State<AppState>, Path(submission_id): Path<i64>) -> Response {
    match assignment_submission::Entity::find_by_id(submission_id)
        .one(state.db())
        .await
    {
        Ok(Some(_)) => {}
        Ok(None) => return not_found(format!("Submission {submission_id} not found")),
        Err(e) => return error_response(e.into()),
    }

    enqueue_response(
        state.queue(),
        Job::ExtractSubmissionText { submission_id },
        "Text extraction queued",
    )
    .await
}
