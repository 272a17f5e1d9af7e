use api::app;
use api::state::AppState;
use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use db::models::assignment::{self, AssignmentStatus};
use db::models::assignment_submission;
use db::test_utils::setup_test_db;
use grader::{GradingResult, Job, JobHandler, RetryPolicy, TaskQueue};
use sea_orm::DatabaseConnection;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tower::ServiceExt;

/// Holds every job until the test releases it.
struct HeldHandler {
    gate: Semaphore,
}

#[async_trait]
impl JobHandler for HeldHandler {
    async fn handle(&self, _job: Job) -> GradingResult<()> {
        self.gate.acquire().await.unwrap().forget();
        Ok(())
    }
}

async fn make_app() -> (Router, DatabaseConnection, Arc<HeldHandler>) {
    let db = setup_test_db().await;
    let handler = Arc::new(HeldHandler {
        gate: Semaphore::new(0),
    });
    let queue = TaskQueue::new(handler.clone(), 2, RetryPolicy::default());
    (app(AppState::new(db.clone(), queue)), db, handler)
}

async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = res.status();
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn health_and_stats_respond() {
    let (app, _db, _) = make_app().await;

    let (status, json) = send(&app, "GET", "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"], "OK");

    let (status, json) = send(&app, "GET", "/api/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["running"], 0);
    assert_eq!(json["data"]["max_concurrent"], 2);
}

#[tokio::test]
async fn activation_schedules_the_evaluation() {
    let (app, db, _) = make_app().await;
    let deadline = Utc::now() + Duration::days(2);
    let a = assignment::Entity::create_assignment(&db, "Enzymes", deadline, None)
        .await
        .unwrap();

    let (status, json) = send(&app, "POST", &format!("/api/assignments/{}/activate", a.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["status"], AssignmentStatus::Active.to_string());
    assert_eq!(json["data"]["training_queued"], false);

    let (status, json) = send(&app, "POST", &format!("/api/assignments/{}/activate", a.id)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);

    let (status, _) = send(&app, "POST", "/api/assignments/999/activate").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn evaluation_trigger_rejects_duplicates() {
    let (app, db, handler) = make_app().await;
    let a = assignment::Entity::create_assignment(&db, "Genetics", Utc::now(), None)
        .await
        .unwrap();
    let uri = format!("/api/assignments/{}/evaluate", a.id);

    let (status, json) = send(&app, "POST", &uri).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["data"]["job"], format!("evaluate_assignment:{}", a.id));
    assert_eq!(json["data"]["queued"], true);

    let (status, json) = send(&app, "POST", &uri).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["data"]["queued"], false);

    handler.gate.add_permits(1);

    let (status, _) = send(&app, "POST", "/api/assignments/404/evaluate").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn ocr_trigger_requires_an_existing_submission() {
    let (app, db, handler) = make_app().await;
    let a = assignment::Entity::create_assignment(&db, "Ecology", Utc::now(), None)
        .await
        .unwrap();
    let s = assignment_submission::Entity::create_submission(&db, a.id, 12, Some("/tmp/12.pdf"))
        .await
        .unwrap();

    let (status, json) = send(&app, "POST", &format!("/api/submissions/{}/ocr", s.id)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["data"]["job"], format!("extract_submission_text:{}", s.id));
    handler.gate.add_permits(1);

    let (status, json) = send(&app, "POST", "/api/submissions/31337/ocr").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn activation_queues_training_when_a_resource_is_attached() {
    let (app, db, handler) = make_app().await;
    let deadline = Utc::now() + Duration::days(2);
    let a = assignment::Entity::create_assignment(&db, "Cell division", deadline, Some("/tmp/memo.pdf"))
        .await
        .unwrap();

    let (status, json) = send(&app, "POST", &format!("/api/assignments/{}/activate", a.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["training_queued"], true);

    let (status, json) = send(&app, "POST", &format!("/api/assignments/{}/train", a.id)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["data"]["job"], format!("train_collection:{}", a.id));

    handler.gate.add_permits(1);
}

#[tokio::test]
async fn training_and_collection_deletion_are_queued() {
    let (app, db, handler) = make_app().await;
    let with_memo = assignment::Entity::create_assignment(&db, "Mitosis", Utc::now(), Some("/tmp/m.pdf"))
        .await
        .unwrap();
    let without_memo = assignment::Entity::create_assignment(&db, "Meiosis", Utc::now(), None)
        .await
        .unwrap();

    let (status, json) = send(&app, "POST", &format!("/api/assignments/{}/train", with_memo.id)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["data"]["job"], format!("train_collection:{}", with_memo.id));

    let (status, json) = send(&app, "POST", &format!("/api/assignments/{}/train", without_memo.id)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);

    let (status, _) = send(&app, "POST", "/api/assignments/777/train").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = send(&app, "DELETE", &format!("/api/assignments/{}/collection", with_memo.id)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["data"]["job"], format!("delete_collection:{}", with_memo.id));

    let (status, _) = send(&app, "DELETE", "/api/assignments/777/collection").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    handler.gate.add_permits(2);
}
