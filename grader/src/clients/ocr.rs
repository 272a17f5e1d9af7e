use super::{OcrEngine, document_part, transport_error};
use crate::error::GradingResult;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use util::config;

pub(crate) const SERVICE: &str = "ocr";

/// Text extracted from a document, plus the service's raw response.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrOutput {
    pub text: String,
    pub raw: Value,
}

impl OcrOutput {
    /// Join the `extracted_text` of every page with a blank line, preserving page order.
    /// Pages without text contribute an empty string.
    pub fn from_response(raw: Value) -> Self {
        let text = raw
            .get("pages")
            .and_then(Value::as_array)
            .map(|pages| {
                pages
                    .iter()
                    .map(|p| p.get("extracted_text").and_then(Value::as_str).unwrap_or(""))
                    .collect::<Vec<_>>()
                    .join("\n\n")
            })
            .unwrap_or_default();
        Self { text, raw }
    }
}

/// HTTP client for the text-extraction service (`POST {OCR_URL}`, multipart `file`).
#[derive(Clone)]
pub struct OcrClient {
    http: Client,
    url: String,
    timeout: Duration,
}

impl OcrClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: Client::new(),
            url: url.into(),
            timeout,
        }
    }

    pub fn from_config() -> Self {
        Self::new(
            config::ocr_url(),
            Duration::from_secs(config::ocr_timeout_secs()),
        )
    }
}

#[async_trait]
impl OcrEngine for OcrClient {
    async fn extract_text(&self, document: &Path) -> GradingResult<OcrOutput> {
        let part = document_part(SERVICE, document).await?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let raw: Value = self
            .http
            .post(&self.url)
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(transport_error(SERVICE))?
            .json()
            .await
            .map_err(transport_error(SERVICE))?;

        Ok(OcrOutput::from_response(raw))
    }
}
