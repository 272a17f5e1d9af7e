mod helpers;

use axum::extract::{Form, Multipart, Path};
use axum::http::StatusCode;
use axum::routing::{delete, post};
use axum::{Json, Router};
use grader::GradingError;
use grader::clients::rag::collection_name;
use grader::clients::{
    CorrectnessScorer, OcrClient, OcrEngine, PlagiarismChecker, PlagiarismClient,
    PlagiarismEntry, PlagiarismPayload, RagClient,
};
use helpers::spawn_stub;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;
use util::test_helpers::{setup_test_document_dir, write_test_document};

const TIMEOUT: Duration = Duration::from_secs(5);

/// Echo each multipart field as `name=file_name:len`.
async fn describe_multipart(mut multipart: Multipart) -> Vec<String> {
    let mut fields = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.unwrap();
        if file_name.is_empty() {
            fields.push(format!("{name}={}", String::from_utf8_lossy(&bytes)));
        } else {
            fields.push(format!("{name}={file_name}:{}", bytes.len()));
        }
    }
    fields
}

fn entry(id: &str, student: &str) -> PlagiarismEntry {
    PlagiarismEntry {
        submission_id: id.to_string(),
        student_id: student.to_string(),
        extracted_text: format!("text of {student}"),
        submitted_at: "2026-03-01T10:00:00+00:00".to_string(),
    }
}

#[tokio::test]
async fn ocr_uploads_the_document_and_joins_pages() {
    let app = Router::new().route(
        "/pdf",
        post(|multipart: Multipart| async move {
            let fields = describe_multipart(multipart).await;
            Json(json!({"pages": [
                {"extracted_text": fields.join(",")},
                {"extracted_text": "second page"}
            ]}))
        }),
    );
    let addr = spawn_stub(app).await;
    let dir = setup_test_document_dir();
    let doc = write_test_document(dir.path(), "essay.pdf", b"%PDF-1.4 fake");

    let client = OcrClient::new(format!("http://{addr}/pdf"), TIMEOUT);
    let out = client.extract_text(&doc).await.unwrap();

    assert_eq!(out.text, "file=essay.pdf:13\n\nsecond page");
    assert_eq!(out.raw["pages"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn ocr_server_errors_are_transport_failures() {
    let app = Router::new().route("/pdf", post(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
    let addr = spawn_stub(app).await;
    let dir = setup_test_document_dir();
    let doc = write_test_document(dir.path(), "essay.pdf", b"%PDF");

    let err = OcrClient::new(format!("http://{addr}/pdf"), TIMEOUT)
        .extract_text(&doc)
        .await
        .unwrap_err();
    assert!(matches!(err, GradingError::Transport { service: "ocr", .. }));
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn ocr_missing_document_is_a_transport_error() {
    let dir = setup_test_document_dir();
    let err = OcrClient::new("http://127.0.0.1:1/pdf", TIMEOUT)
        .extract_text(&dir.path().join("absent.pdf"))
        .await
        .unwrap_err();
    assert!(matches!(err, GradingError::Transport { .. }));
    assert!(err.to_string().contains("absent.pdf"));
}

#[tokio::test]
async fn plagiarism_posts_json_and_returns_raw_results() {
    let app = Router::new().route(
        "/api/plagiarism/check",
        post(|Json(body): Json<Value>| async move {
            let results: Vec<Value> = body["assignments"]
                .as_array()
                .unwrap()
                .iter()
                .map(|e| json!({"assignment_id": e["assignment_id"], "plagiarism_score": 0.1}))
                .collect();
            Json(json!({"success": true, "group": body["assignment_group_id"], "results": results}))
        }),
    );
    let addr = spawn_stub(app).await;
    let client = PlagiarismClient::new(format!("http://{addr}/api/plagiarism/check"), TIMEOUT);

    let payload = PlagiarismPayload {
        assignment_group_id: "7".into(),
        assignments: vec![entry("11", "101"), entry("12", "102")],
    };
    let response = client.check(&payload).await.unwrap();

    assert!(response.success);
    assert_eq!(response.results.len(), 2);
    assert_eq!(response.results[1]["assignment_id"], "12");
}

#[tokio::test]
async fn plagiarism_with_fewer_than_two_entries_never_calls_out() {
    // Nothing listens on port 1; reaching the network would fail.
    let client = PlagiarismClient::new("http://127.0.0.1:1/check", TIMEOUT);
    let payload = PlagiarismPayload {
        assignment_group_id: "7".into(),
        assignments: vec![entry("11", "101")],
    };

    let response = client.check(&payload).await.unwrap();
    assert!(response.success);
    assert!(response.results.is_empty());
}

#[tokio::test]
async fn plagiarism_unsuccessful_reply_is_a_transport_failure() {
    let app = Router::new().route(
        "/check",
        post(|| async { Json(json!({"success": false, "error": "model offline"})) }),
    );
    let addr = spawn_stub(app).await;
    let client = PlagiarismClient::new(format!("http://{addr}/check"), TIMEOUT);
    let payload = PlagiarismPayload {
        assignment_group_id: "7".into(),
        assignments: vec![entry("11", "101"), entry("12", "102")],
    };

    let err = client.check(&payload).await.unwrap_err();
    assert!(err.is_retryable());
}

fn rag_stub() -> Router {
    Router::new()
        .route(
            "/score",
            post(|Form(form): Form<HashMap<String, String>>| async move {
                match form.get("collection_name").map(String::as_str) {
                    Some("assign_known") => Json(json!({
                        "success": true,
                        "score": 78.5,
                        "echo": form.get("extracted_text"),
                    })),
                    _ => Json(json!({"success": false, "error": "collection not found"})),
                }
            }),
        )
        .route(
            "/train",
            post(|multipart: Multipart| async move {
                Json(json!({"success": true, "fields": describe_multipart(multipart).await}))
            }),
        )
        .route(
            "/collection/{name}",
            delete(|Path(name): Path<String>| async move {
                Json(json!({"success": true, "deleted": name}))
            }),
        )
}

#[tokio::test]
async fn rag_scores_on_a_hundred_scale_are_normalized() {
    let addr = spawn_stub(rag_stub()).await;
    let client = RagClient::new(format!("http://{addr}/"), TIMEOUT, TIMEOUT);

    let score = client.score("assign_known", "an answer").await.unwrap();
    assert_eq!(score, 7.85);

    let err = client.score("assign_missing", "an answer").await.unwrap_err();
    assert!(matches!(err, GradingError::RejectedScore(ref m) if m == "collection not found"));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn rag_training_and_deletion_hit_their_endpoints() {
    let addr = spawn_stub(rag_stub()).await;
    let client = RagClient::new(format!("http://{addr}"), TIMEOUT, TIMEOUT);
    let dir = setup_test_document_dir();
    let doc = write_test_document(dir.path(), "memo.pdf", b"reference");
    let name = collection_name(3);

    let trained = client.train(&doc, &name).await.unwrap();
    let fields: Vec<String> = serde_json::from_value(trained["fields"].clone()).unwrap();
    assert!(fields.contains(&"file=memo.pdf:9".to_string()));
    assert!(fields.contains(&format!("collection_name={name}")));

    let deleted = client.delete_collection(&name).await.unwrap();
    assert_eq!(deleted["deleted"], name.as_str());
}

#[tokio::test]
async fn rag_slow_scoring_times_out() {
    let app = Router::new().route(
        "/score",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({"success": true, "score": 5}))
        }),
    );
    let addr = spawn_stub(app).await;
    let client = RagClient::new(format!("http://{addr}"), Duration::from_millis(200), TIMEOUT);

    let err = client.score("assign_known", "text").await.unwrap_err();
    assert!(matches!(err, GradingError::Transport { service: "rag", .. }));
}
