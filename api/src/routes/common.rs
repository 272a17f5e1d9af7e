use crate::response::ApiResponse;
use axum::{Json, http::StatusCode, response::IntoResponse, response::Response};
use grader::{GradingError, Job, TaskQueue};
use serde::Serialize;

#[derive(Debug, Default, Serialize)]
pub struct QueuedJob {
    pub job: String,
    pub queued: bool,
}

/// Map a pipeline error onto a status code and an error envelope.
pub fn error_response(err: GradingError) -> Response {
    let status = match &err {
        GradingError::Validation(_) => StatusCode::BAD_REQUEST,
        GradingError::DataIntegrity(_) => StatusCode::NOT_FOUND,
        GradingError::RejectedScore(_) => StatusCode::UNPROCESSABLE_ENTITY,
        GradingError::Transport { .. } => StatusCode::BAD_GATEWAY,
        GradingError::Database(e) => {
            tracing::error!(error = %e, "Database error while handling request");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ApiResponse::<()>::error(err.to_string()))).into_response()
}

pub fn not_found(message: impl Into<String>) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::error(message)),
    )
        .into_response()
}

/// Enqueue `job`, answering 202 when accepted and 409 when it is already in flight.
pub async fn enqueue_response(queue: &TaskQueue, job: Job, message: &str) -> Response {
    let queued = queue.enqueue(job).await.is_some();
    let body = QueuedJob {
        job: job.key(),
        queued,
    };
    if queued {
        (StatusCode::ACCEPTED, Json(ApiResponse::success(body, message))).into_response()
    } else {
        (
            StatusCode::CONFLICT,
            Json(ApiResponse {
                success: false,
                data: body,
                message: "Job already queued or running".to_string(),
            }),
        )
            .into_response()
    }
}
