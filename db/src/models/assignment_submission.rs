use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, ConnectionTrait, QueryOrder};
use std::fmt;

/// Represents the status of a submission throughout its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum SubmissionStatus {
    /// Created, nothing uploaded yet
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Uploaded before the deadline, waiting for grading
    #[sea_orm(string_value = "submitted")]
    Submitted,
    /// Correctness scored, final score not yet computed
    #[sea_orm(string_value = "processed_rag")]
    ProcessedRag,
    /// Final score assigned
    #[sea_orm(string_value = "graded")]
    Graded,
    /// Uploaded after the deadline
    #[sea_orm(string_value = "late")]
    Late,
}

impl Default for SubmissionStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Submitted => "submitted",
            SubmissionStatus::ProcessedRag => "processed_rag",
            SubmissionStatus::Graded => "graded",
            SubmissionStatus::Late => "late",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum OcrStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "success")]
    Success,
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl Default for OcrStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for OcrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OcrStatus::Pending => "pending",
            OcrStatus::Success => "success",
            OcrStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum CorrectnessStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "graded")]
    Graded,
    /// The scoring service answered but refused or gave no usable score.
    #[sea_orm(string_value = "failed")]
    Failed,
    /// The scoring service could not be reached.
    #[sea_orm(string_value = "error")]
    Error,
}

impl Default for CorrectnessStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for CorrectnessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CorrectnessStatus::Pending => "pending",
            CorrectnessStatus::Graded => "graded",
            CorrectnessStatus::Failed => "failed",
            CorrectnessStatus::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// One student's uploaded work for one assignment, together with every
/// partial grading result produced for it.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "assignment_submissions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub assignment_id: i64,
    pub student_id: i64,
    /// Path to the uploaded document on the storage volume.
    pub file_path: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub status: SubmissionStatus,
    #[sea_orm(column_type = "Text", nullable)]
    pub extracted_text: Option<String>,
    pub ocr_status: OcrStatus,
    #[sea_orm(column_type = "Text", nullable)]
    pub ocr_error: Option<String>,
    /// Highest similarity to any peer, 0.0–1.0.
    pub plagiarism_similarity: Option<f64>,
    /// Plagiarism-derived score, 0–10 (10 = original work).
    pub plagiarism_score: Option<f64>,
    /// Tag reported by the comparison service (e.g. `COPIED`).
    pub plagiarism_status: Option<String>,
    pub correctness_score: Option<f64>,
    pub correctness_status: CorrectnessStatus,
    #[sea_orm(column_type = "Text", nullable)]
    pub correctness_error: Option<String>,
    /// Whichever partial score is most current.
    pub marks: Option<f64>,
    pub final_score: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::assignment::Entity",
        from = "Column::AssignmentId",
        to = "super::assignment::Column::Id",
        on_delete = "Cascade"
    )]
    Assignment,
}

impl Related<super::assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Only submissions with usable OCR output take part in plagiarism and correctness.
    pub fn has_extracted_text(&self) -> bool {
        self.extracted_text
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
    }
}

impl Entity {
    /// Insert a submission that has been uploaded and is waiting for OCR.
    pub async fn create_submission<C: ConnectionTrait>(
        db: &C,
        assignment_id: i64,
        student_id: i64,
        file_path: Option<&str>,
    ) -> Result<Model, DbErr> {
        let now = Utc::now();
        ActiveModel {
            assignment_id: Set(assignment_id),
            student_id: Set(student_id),
            file_path: Set(file_path.map(str::to_string)),
            submitted_at: Set(Some(now)),
            status: Set(SubmissionStatus::Submitted),
            extracted_text: Set(None),
            ocr_status: Set(OcrStatus::Pending),
            ocr_error: Set(None),
            plagiarism_similarity: Set(None),
            plagiarism_score: Set(None),
            plagiarism_status: Set(None),
            correctness_score: Set(None),
            correctness_status: Set(CorrectnessStatus::Pending),
            correctness_error: Set(None),
            marks: Set(None),
            final_score: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    /// All submissions of an assignment in the given lifecycle status, oldest first.
    pub async fn find_by_status<C: ConnectionTrait>(
        db: &C,
        assignment_id: i64,
        status: SubmissionStatus,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::AssignmentId.eq(assignment_id))
            .filter(Column::Status.eq(status))
            .order_by_asc(Column::Id)
            .all(db)
            .await
    }

    /// Submissions still awaiting grading that carry non-empty extracted text.
    pub async fn find_gradable<C: ConnectionTrait>(
        db: &C,
        assignment_id: i64,
    ) -> Result<Vec<Model>, DbErr> {
        Ok(Self::find_by_status(db, assignment_id, SubmissionStatus::Submitted)
            .await?
            .into_iter()
            .filter(Model::has_extracted_text)
            .collect())
    }
}
