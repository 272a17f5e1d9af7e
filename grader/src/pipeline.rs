use crate::activation::{delete_collection, train_collection};
use crate::clients::{OcrClient, OcrEngine, PlagiarismClient, RagClient};
use crate::error::GradingResult;
use crate::extraction::{ExtractionOutcome, extract_submission_text};
use crate::orchestrator::{EvaluationOutcome, GradingOrchestrator};
use crate::queue::{Job, JobHandler};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::info;
use util::config;

/// Routes queued jobs to OCR, collection upkeep, or the grading orchestrator.
pub struct GradingPipeline {
    db: DatabaseConnection,
    ocr: Arc<dyn OcrEngine>,
    rag: Arc<RagClient>,
    orchestrator: GradingOrchestrator,
}

impl GradingPipeline {
    pub fn new(
        db: DatabaseConnection,
        ocr: Arc<dyn OcrEngine>,
        rag: Arc<RagClient>,
        orchestrator: GradingOrchestrator,
    ) -> Self {
        Self {
            db,
            ocr,
            rag,
            orchestrator,
        }
    }

    /// Wire the HTTP adapters from configuration.
    pub fn from_config(db: DatabaseConnection) -> Self {
        let rag = Arc::new(RagClient::from_config());
        let orchestrator = GradingOrchestrator::new(
            db.clone(),
            Arc::new(PlagiarismClient::from_config()),
            rag.clone(),
            config::correctness_concurrency(),
        );
        Self::new(db, Arc::new(OcrClient::from_config()), rag, orchestrator)
    }
}

#[async_trait]
impl JobHandler for GradingPipeline {
    async fn handle(&self, job: Job) -> GradingResult<()> {
        match job {
            Job::EvaluateAssignment { assignment_id } => {
                let outcome = self.orchestrator.evaluate(assignment_id, Utc::now()).await?;
                if !matches!(outcome, EvaluationOutcome::Graded(_)) {
                    info!(assignment_id, ?outcome, "Evaluation finished without grading");
                }
            }
            Job::ExtractSubmissionText { submission_id } => {
                let outcome =
                    extract_submission_text(&self.db, self.ocr.as_ref(), submission_id).await?;
                if let ExtractionOutcome::Failed(reason) = outcome {
                    info!(submission_id, %reason, "Extraction left for manual re-trigger");
                }
            }
            Job::TrainCollection { assignment_id } => {
                train_collection(&self.db, &self.rag, assignment_id).await?;
            }
            Job::DeleteCollection { assignment_id } => {
                if !delete_collection(&self.db, &self.rag, assignment_id).await? {
                    info!(assignment_id, "No collection to delete");
                }
            }
        }
        Ok(())
    }
}
