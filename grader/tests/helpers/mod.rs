#![allow(dead_code)]

pub mod fakes;

use axum::Router;
use chrono::{DateTime, Duration, Utc};
use db::models::assignment::{self, AssignmentStatus};
use db::models::assignment_submission::{self as submission, OcrStatus};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection, IntoActiveModel};
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Serve `app` on a random local port.
pub async fn spawn_stub(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub fn past_deadline() -> DateTime<Utc> {
    Utc::now() - Duration::hours(1)
}

pub fn future_deadline() -> DateTime<Utc> {
    Utc::now() + Duration::days(3)
}

/// Insert an assignment and force it into `status`, optionally with a trained collection.
pub async fn seed_assignment(
    db: &DatabaseConnection,
    status: AssignmentStatus,
    deadline: DateTime<Utc>,
    collection: Option<&str>,
) -> assignment::Model {
    let created = assignment::Entity::create_assignment(db, "Photosynthesis essay", deadline, None)
        .await
        .unwrap();
    let mut am = created.into_active_model();
    am.status = Set(status);
    am.rag_collection = Set(collection.map(str::to_string));
    am.update(db).await.unwrap()
}

/// Insert a submission, with OCR already done when `text` is given.
pub async fn seed_submission(
    db: &DatabaseConnection,
    assignment_id: i64,
    student_id: i64,
    text: Option<&str>,
) -> submission::Model {
    let created = submission::Entity::create_submission(db, assignment_id, student_id, None)
        .await
        .unwrap();
    let Some(text) = text else {
        return created;
    };
    let mut am = created.into_active_model();
    am.extracted_text = Set(Some(text.to_string()));
    am.ocr_status = Set(OcrStatus::Success);
    am.update(db).await.unwrap()
}

pub async fn reload(db: &DatabaseConnection, submission_id: i64) -> submission::Model {
    use sea_orm::EntityTrait;
    submission::Entity::find_by_id(submission_id)
        .one(db)
        .await
        .unwrap()
        .unwrap()
}

pub async fn reload_assignment(db: &DatabaseConnection, assignment_id: i64) -> assignment::Model {
    use sea_orm::EntityTrait;
    assignment::Entity::find_by_id(assignment_id)
        .one(db)
        .await
        .unwrap()
        .unwrap()
}
