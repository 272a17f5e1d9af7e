//! HTTP routes under `/api`.
//!
//! - `/health` → liveness probe
//! - `/stats` → task queue occupancy
//! - `/assignments` → activation, evaluation and collection triggers
//! - `/submissions` → manual OCR triggers

use crate::state::AppState;
use axum::Router;
use axum::routing::get;

pub mod assignments;
pub mod common;
pub mod health;
pub mod submissions;
pub mod system;

pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/health", health::health_routes())
        .route("/stats", get(system::queue_stats))
        .nest("/assignments", assignments::assignment_routes())
        .nest("/submissions", submissions::submission_routes())
}
