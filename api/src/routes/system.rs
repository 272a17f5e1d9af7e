use crate::response::ApiResponse;
use crate::state::AppState;
use axum::{Json, extract::State, response::IntoResponse};

/// GET /api/stats
///
/// ```json
/// {
///   "success": true,
///   "data": { "running": 1, "waiting": 0, "max_concurrent": 4 },
///   "message": "Queue stats retrieved"
/// }
/// ```
pub async fn queue_stats(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.queue().stats().await;
    Json(ApiResponse::success(stats, "Queue stats retrieved"))
}
