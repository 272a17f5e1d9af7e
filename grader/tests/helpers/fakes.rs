use async_trait::async_trait;
use grader::clients::{
    CorrectnessScorer, OcrEngine, OcrOutput, PlagiarismChecker, PlagiarismPayload,
    PlagiarismResponse,
};
use grader::{GradingError, GradingResult};
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Answers comparisons from a table of per-student penalties and records every payload.
#[derive(Default)]
pub struct FakePlagiarism {
    penalties: HashMap<i64, (f64, Option<&'static str>)>,
    fail: bool,
    submits: AtomicUsize,
    payloads: Mutex<Vec<PlagiarismPayload>>,
}

impl FakePlagiarism {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn penalty(mut self, student_id: i64, penalty: f64, status: Option<&'static str>) -> Self {
        self.penalties.insert(student_id, (penalty, status));
        self
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn submits(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }

    pub fn last_payload(&self) -> Option<PlagiarismPayload> {
        self.payloads.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl PlagiarismChecker for FakePlagiarism {
    async fn submit(&self, payload: &PlagiarismPayload) -> GradingResult<PlagiarismResponse> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        self.payloads.lock().unwrap().push(payload.clone());
        if self.fail {
            return Err(GradingError::transport("plagiarism", "HTTP 503"));
        }

        let results = payload
            .assignments
            .iter()
            .filter_map(|entry| {
                let student: i64 = entry.student_id.parse().ok()?;
                let (penalty, status) = self.penalties.get(&student)?;
                Some(json!({
                    "assignment_id": entry.submission_id,
                    "plagiarism_score": penalty,
                    "max_similarity": penalty,
                    "status": status,
                }))
            })
            .collect();

        Ok(PlagiarismResponse {
            success: true,
            results,
        })
    }
}

#[derive(Clone, Copy)]
pub enum Scripted {
    Score(f64),
    TransportError,
    Rejected,
}

/// Scores by extracted text; unknown texts score 5.0. Records every text it scores.
#[derive(Default)]
pub struct FakeScorer {
    script: HashMap<String, Scripted>,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, text: &str, answer: Scripted) -> Self {
        self.script.insert(text.to_string(), answer);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn scored_texts(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
    }

    pub fn collections(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(c, _)| c.clone()).collect()
    }
}

#[async_trait]
impl CorrectnessScorer for FakeScorer {
    async fn score(&self, collection: &str, extracted_text: &str) -> GradingResult<f64> {
        self.calls
            .lock()
            .unwrap()
            .push((collection.to_string(), extracted_text.to_string()));
        match self.script.get(extracted_text).copied().unwrap_or(Scripted::Score(5.0)) {
            Scripted::Score(s) => Ok(s),
            Scripted::TransportError => Err(GradingError::transport("rag", "request timed out")),
            Scripted::Rejected => Err(GradingError::RejectedScore("collection missing".into())),
        }
    }
}

/// Returns fixed text, or fails, and records the documents it was given.
pub struct FakeOcr {
    result: Result<String, String>,
    documents: Mutex<Vec<PathBuf>>,
}

impl FakeOcr {
    pub fn returning(text: &str) -> Self {
        Self {
            result: Ok(text.to_string()),
            documents: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            documents: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.documents.lock().unwrap().len()
    }
}

#[async_trait]
impl OcrEngine for FakeOcr {
    async fn extract_text(&self, document: &Path) -> GradingResult<OcrOutput> {
        self.documents.lock().unwrap().push(document.to_path_buf());
        match &self.result {
            Ok(text) => Ok(OcrOutput {
                text: text.clone(),
                raw: json!({"pages": [{"extracted_text": text}]}),
            }),
            Err(message) => Err(GradingError::transport("ocr", message.clone())),
        }
    }
}
