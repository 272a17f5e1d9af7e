use super::{PlagiarismChecker, transport_error};
use crate::error::GradingResult;
use async_trait::async_trait;
use db::models::{assignment, assignment_submission};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use util::config;

pub(crate) const SERVICE: &str = "plagiarism";

/// One submission as seen by the comparison service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlagiarismEntry {
    /// The service calls submissions "assignments"; this carries the submission id.
    #[serde(rename = "assignment_id")]
    pub submission_id: String,
    pub student_id: String,
    pub extracted_text: String,
    pub submitted_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlagiarismPayload {
    pub assignment_group_id: String,
    pub assignments: Vec<PlagiarismEntry>,
}

impl PlagiarismPayload {
    /// Build the comparison request for an assignment.
    ///
    /// Submissions without extracted text are left out: a failed OCR simply makes a
    /// submission invisible to the comparison. Input order is preserved.
    pub fn build(
        assignment: &assignment::Model,
        submissions: &[assignment_submission::Model],
    ) -> Self {
        let assignments = submissions
            .iter()
            .filter(|s| s.has_extracted_text())
            .map(|s| PlagiarismEntry {
                submission_id: s.id.to_string(),
                student_id: s.student_id.to_string(),
                extracted_text: s.extracted_text.clone().unwrap_or_default(),
                submitted_at: s.submitted_at.unwrap_or(s.created_at).to_rfc3339(),
            })
            .collect();

        Self {
            assignment_group_id: assignment.id.to_string(),
            assignments,
        }
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// Raw comparison response. Result rows are kept as JSON because the service is
/// untrusted; they are validated one by one when persisted.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlagiarismResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub results: Vec<Value>,
}

impl PlagiarismResponse {
    pub fn empty() -> Self {
        Self {
            success: true,
            results: Vec::new(),
        }
    }
}

/// HTTP client for the comparison service (`POST {PLAGIARISM_URL}`, JSON body).
#[derive(Clone)]
pub struct PlagiarismClient {
    http: Client,
    url: String,
    timeout: Duration,
}

impl PlagiarismClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: Client::new(),
            url: url.into(),
            timeout,
        }
    }

    pub fn from_config() -> Self {
        Self::new(
            config::plagiarism_url(),
            Duration::from_secs(config::plagiarism_timeout_secs()),
        )
    }
}

#[async_trait]
impl PlagiarismChecker for PlagiarismClient {
    async fn submit(&self, payload: &PlagiarismPayload) -> GradingResult<PlagiarismResponse> {
        tracing::debug!(
            group = %payload.assignment_group_id,
            entries = payload.len(),
            "Sending plagiarism comparison"
        );

        self.http
            .post(&self.url)
            .json(payload)
            .timeout(self.timeout)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(transport_error(SERVICE))?
            .json::<PlagiarismResponse>()
            .await
            .map_err(transport_error(SERVICE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use db::models::assignment::{AssignmentStatus, GradingStage};
    use db::models::assignment_submission::{CorrectnessStatus, OcrStatus, SubmissionStatus};

    fn assignment() -> assignment::Model {
        let t = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        assignment::Model {
            id: 5,
            title: "Cell biology".into(),
            deadline: t,
            status: AssignmentStatus::Active,
            grading_stage: GradingStage::AwaitingDeadline,
            rag_collection: None,
            rag_trained_at: None,
            resource_path: None,
            graded_at: None,
            created_at: t,
            updated_at: t,
        }
    }

    fn submission(id: i64, text: Option<&str>) -> assignment_submission::Model {
        let t = Utc.with_ymd_and_hms(2026, 2, 27, 9, 30, 0).unwrap();
        assignment_submission::Model {
            id,
            assignment_id: 5,
            student_id: 100 + id,
            file_path: None,
            submitted_at: Some(t),
            status: SubmissionStatus::Submitted,
            extracted_text: text.map(str::to_string),
            ocr_status: OcrStatus::Success,
            ocr_error: None,
            plagiarism_similarity: None,
            plagiarism_score: None,
            plagiarism_status: None,
            correctness_score: None,
            correctness_status: CorrectnessStatus::Pending,
            correctness_error: None,
            marks: None,
            final_score: None,
            created_at: t,
            updated_at: t,
        }
    }

    #[test]
    fn payload_excludes_submissions_without_text() {
        let subs = vec![
            submission(1, Some("mitochondria")),
            submission(2, None),
            submission(3, Some("ribosomes")),
        ];
        let payload = PlagiarismPayload::build(&assignment(), &subs);

        assert_eq!(payload.assignment_group_id, "5");
        assert_eq!(payload.len(), 2);
        assert_eq!(payload.assignments[0].submission_id, "1");
        assert_eq!(payload.assignments[1].submission_id, "3");
        assert_eq!(payload.assignments[1].student_id, "103");
    }

    #[test]
    fn payload_serializes_with_service_field_names() {
        let payload = PlagiarismPayload::build(&assignment(), &[submission(9, Some("text"))]);
        let json = serde_json::to_value(&payload).unwrap();
        let entry = &json["assignments"][0];

        assert_eq!(entry["assignment_id"], "9");
        assert_eq!(entry["extracted_text"], "text");
        assert_eq!(entry["submitted_at"], "2026-02-27T09:30:00+00:00");
        assert!(entry.get("submission_id").is_none());
    }

    #[test]
    fn response_tolerates_missing_fields() {
        let r: PlagiarismResponse = serde_json::from_str("{}").unwrap();
        assert!(!r.success);
        assert!(r.results.is_empty());
    }
}
