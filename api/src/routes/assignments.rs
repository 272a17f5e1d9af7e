use super::common::{enqueue_response, error_response, not_found};
use crate::response::ApiResponse;
use crate::state::AppState;
use axum::{
    Json, Router,
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::{delete, post},
};
use chrono::{DateTime, Utc};
use db::models::assignment;
use grader::activation::activate_assignment;
use grader::{GradingError, Job};
use sea_orm::EntityTrait;
use serde::Serialize;

pub fn assignment_routes() -> Router<AppState> {
    Router::new()
        .route("/{assignment_id}/activate", post(activate))
        .route("/{assignment_id}/evaluate", post(evaluate))
        .route("/{assignment_id}/train", post(train))
        .route("/{assignment_id}/collection", delete(drop_collection))
}

#[derive(Debug, Serialize)]
pub struct ActivationResponse {
    pub id: i64,
    pub status: String,
    pub evaluation_at: DateTime<Utc>,
    pub training_queued: bool,
}

/// POST /api/assignments/{assignment_id}/activate
///
/// Moves a DRAFT assignment to ACTIVE and schedules its evaluation at the deadline.
/// Queues collection training when the assignment has a resource document and no
/// collection yet.
///
/// - `200 OK` with the scheduled instant
/// - `400 Bad Request` when the assignment is not DRAFT or the deadline has passed
/// - `404 Not Found` when the assignment does not exist
async fn activate(State(state): State<AppState>, Path(assignment_id): Path<i64>) -> Response {
    match activate_assignment(state.db(), assignment_id, Utc::now()).await {
        Ok((activated, timer)) => {
            let needs_training =
                activated.resource_path.is_some() && activated.rag_collection.is_none();
            let training_queued = needs_training
                && state
                    .queue()
                    .enqueue(Job::TrainCollection { assignment_id })
                    .await
                    .is_some();
            Json(ApiResponse::success(
                ActivationResponse {
                    id: activated.id,
                    status: activated.status.to_string(),
                    evaluation_at: timer.run_at,
                    training_queued,
                },
                "Assignment activated",
            ))
            .into_response()
        }
        Err(e) => error_response(e),
    }
}

/// POST /api/assignments/{assignment_id}/evaluate
///
/// Queues an evaluation right away. Used to finish an incomplete grading run.
///
/// - `202 Accepted` when queued
/// - `404 Not Found` when the assignment does not exist
/// - `409 Conflict` when an evaluation of this assignment is already queued or running
async fn evaluate(State(state): State<AppState>, Path(assignment_id): Path<i64>) -> Response {
    match assignment::Entity::find_by_id(assignment_id).one(state.db()).await {
        Ok(Some(_)) => {}
        Ok(None) => return not_found(format!("Assignment {assignment_id} not found")),
        Err(e) => return error_response(e.into()),
    }

    enqueue_response(
        state.queue(),
        Job::EvaluateAssignment { assignment_id },
        "Evaluation queued",
    )
    .await
}

/// POST /api/assignments/{assignment_id}/train
///
/// Queues (re)training of the assignment's reference collection from its resource
/// document.
///
/// - `202 Accepted` when queued
/// - `400 Bad Request` when the assignment has no resource document
/// - `404 Not Found` when the assignment does not exist
/// - `409 Conflict` when training is already queued or running
async fn train(State(state): State<AppState>, Path(assignment_id): Path<i64>) -> Response {
    let model = match assignment::Entity::find_by_id(assignment_id).one(state.db()).await {
        Ok(Some(model)) => model,
        Ok(None) => return not_found(format!("Assignment {assignment_id} not found")),
        Err(e) => return error_response(e.into()),
    };
    if model.resource_path.is_none() {
        return error_response(GradingError::Validation(format!(
            "assignment {assignment_id} has no resource document"
        )));
    }

    enqueue_response(
        state.queue(),
        Job::TrainCollection { assignment_id },
        "Training queued",
    )
    .await
}

/// DELETE /api/assignments/{assignment_id}/collection
///
/// Queues deletion of the assignment's reference collection.
///
/// - `202 Accepted` when queued
/// - `404 Not Found` when the assignment does not exist
/// - `409 Conflict` when a deletion is already queued or running
async fn drop_collection(
    State(state): State<AppState>,
    Path(assignment_id): Path<i64>,
) -> Response {
    match assignment::Entity::find_by_id(assignment_id).one(state.db()).await {
        Ok(Some(_)) => {}
        Ok(None) => return not_found(format!("Assignment {assignment_id} not found")),
        Err(e) => return error_response(e.into()),
    }

    enqueue_response(
        state.queue(),
        Job::DeleteCollection { assignment_id },
        "Collection deletion queued",
    )
    .await
}
