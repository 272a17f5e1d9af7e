//! Adapters for the three remote scoring services.
//!
//! Each service sits behind a trait so the orchestrator can be driven by the real
//! HTTP clients in production and by in-process fakes in tests.

pub mod ocr;
pub mod plagiarism;
pub mod rag;

use crate::error::{GradingError, GradingResult};
use async_trait::async_trait;
use std::path::Path;

pub use ocr::{OcrClient, OcrOutput};
pub use plagiarism::{PlagiarismClient, PlagiarismEntry, PlagiarismPayload, PlagiarismResponse};
pub use rag::RagClient;

/// Turns a document into text.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn extract_text(&self, document: &Path) -> GradingResult<OcrOutput>;
}

/// Compares the extracted texts of a submission group.
#[async_trait]
pub trait PlagiarismChecker: Send + Sync {
    /// Send the payload to the comparison service. Implementations may assume the
    /// payload holds at least two entries.
    async fn submit(&self, payload: &PlagiarismPayload) -> GradingResult<PlagiarismResponse>;

    /// Check a submission group. Fewer than two entries cannot be compared, so
    /// that case succeeds with no results and never reaches [`submit`](Self::submit).
    async fn check(&self, payload: &PlagiarismPayload) -> GradingResult<PlagiarismResponse> {
        if payload.assignments.len() < 2 {
            return Ok(PlagiarismResponse::empty());
        }
        let response = self.submit(payload).await?;
        if !response.success {
            return Err(GradingError::transport(
                plagiarism::SERVICE,
                "service reported an unsuccessful comparison",
            ));
        }
        Ok(response)
    }
}

/// Scores extracted text against a trained collection. Returns a 0–10 score.
#[async_trait]
pub trait CorrectnessScorer: Send + Sync {
    async fn score(&self, collection: &str, extracted_text: &str) -> GradingResult<f64>;
}

/// Map a `reqwest` failure onto a transport error for `service`.
pub(crate) fn transport_error(service: &'static str) -> impl Fn(reqwest::Error) -> GradingError {
    move |e| {
        let message = match e.status() {
            Some(status) => format!("HTTP {status}: {e}"),
            None if e.is_timeout() => format!("request timed out: {e}"),
            None => e.to_string(),
        };
        GradingError::transport(service, message)
    }
}

/// Read a document and wrap it as a multipart `file` part.
pub(crate) async fn document_part(
    service: &'static str,
    document: &Path,
) -> GradingResult<reqwest::multipart::Part> {
    let bytes = tokio::fs::read(document).await.map_err(|e| {
        GradingError::transport(
            service,
            format!("cannot read document {}: {e}", document.display()),
        )
    })?;
    let file_name = document
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("document.pdf")
        .to_string();

    reqwest::multipart::Part::bytes(bytes)
        .file_name(file_name)
        .mime_str("application/pdf")
        .map_err(transport_error(service))
}
