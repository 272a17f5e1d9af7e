use super::{CorrectnessScorer, document_part, transport_error};
use crate::error::{GradingError, GradingResult};
use crate::scoring::normalize_correctness;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::Duration;
use util::config;

pub(crate) const SERVICE: &str = "rag";

const DELETE_TIMEOUT: Duration = Duration::from_secs(30);

/// Collection name for an assignment: `assign_` plus the first 16 hex chars of the
/// SHA-256 of its id. Stays well under the 63-character limit of the vector store.
pub fn collection_name(assignment_id: i64) -> String {
    let digest = Sha256::digest(assignment_id.to_string().as_bytes());
    let hex = hex::encode(digest);
    format!("assign_{}", &hex[..16])
}

/// HTTP client for the retrieval-augmented scoring service.
///
/// - `POST {RAG_URL}/score` (form) scores extracted text.
/// - `POST {RAG_URL}/train` (multipart) trains a collection from a document.
/// - `DELETE {RAG_URL}/collection/{name}` drops a collection.
#[derive(Clone)]
pub struct RagClient {
    http: Client,
    base_url: String,
    score_timeout: Duration,
    train_timeout: Duration,
}

impl RagClient {
    pub fn new(base_url: impl Into<String>, score_timeout: Duration, train_timeout: Duration) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            score_timeout,
            train_timeout,
        }
    }

    pub fn from_config() -> Self {
        Self::new(
            config::rag_url(),
            Duration::from_secs(config::rag_timeout_secs()),
            Duration::from_secs(config::rag_train_timeout_secs()),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Train `collection` from a reference document. Returns the service acknowledgement.
    pub async fn train(&self, document: &Path, collection: &str) -> GradingResult<Value> {
        let part = document_part(SERVICE, document).await?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("collection_name", collection.to_string());

        self.http
            .post(self.url("train"))
            .multipart(form)
            .timeout(self.train_timeout)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(transport_error(SERVICE))?
            .json()
            .await
            .map_err(transport_error(SERVICE))
    }

    pub async fn delete_collection(&self, collection: &str) -> GradingResult<Value> {
        self.http
            .delete(self.url(&format!("collection/{collection}")))
            .timeout(DELETE_TIMEOUT)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(transport_error(SERVICE))?
            .json()
            .await
            .map_err(transport_error(SERVICE))
    }
}

/// Pull a normalized score out of a `/score` response body.
pub(crate) fn score_from_response(body: &Value) -> GradingResult<f64> {
    if !body.get("success").and_then(Value::as_bool).unwrap_or(false) {
        let reason = body
            .get("error")
            .or_else(|| body.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("service reported failure");
        return Err(GradingError::RejectedScore(reason.to_string()));
    }

    let raw = match body.get("score") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
    .ok_or_else(|| GradingError::RejectedScore("response carried no numeric score".into()))?;

    Ok(normalize_correctness(raw))
}

#[async_trait]
impl CorrectnessScorer for RagClient {
    async fn score(&self, collection: &str, extracted_text: &str) -> GradingResult<f64> {
        let body: Value = self
            .http
            .post(self.url("score"))
            .form(&[
                ("collection_name", collection),
                ("extracted_text", extracted_text),
            ])
            .timeout(self.score_timeout)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(transport_error(SERVICE))?
            .json()
            .await
            .map_err(transport_error(SERVICE))?;

        score_from_response(&body)
    }
}
