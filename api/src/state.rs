//! Shared state handed to every route handler through axum's `State` extractor.

use grader::TaskQueue;
use sea_orm::DatabaseConnection;

#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    queue: TaskQueue,
}

impl AppState {
    pub fn new(db: DatabaseConnection, queue: TaskQueue) -> Self {
        Self { db, queue }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }
}
