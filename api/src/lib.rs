pub mod response;
pub mod routes;
pub mod state;

use axum::Router;
use state::AppState;

/// The full HTTP application: every route nested under `/api`.
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", routes::routes())
        .with_state(state)
}
