//! Assignment entity: the deadline, lifecycle status and grading progress of one
//! assignment, plus the trained knowledge collection used for correctness scoring.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, ConnectionTrait, IntoActiveModel};
use std::fmt;

/// Lifecycle of an assignment. Transitions are monotonic: DRAFT → ACTIVE → GRADED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum AssignmentStatus {
    #[sea_orm(string_value = "DRAFT")]
    Draft,
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    /// Terminal. No further orchestration happens once here.
    #[sea_orm(string_value = "GRADED")]
    Graded,
}

impl AssignmentStatus {
    /// Whether moving from `self` to `next` respects the DRAFT → ACTIVE → GRADED order.
    pub fn can_transition_to(self, next: AssignmentStatus) -> bool {
        matches!(
            (self, next),
            (AssignmentStatus::Draft, AssignmentStatus::Active)
                | (AssignmentStatus::Active, AssignmentStatus::Graded)
        )
    }
}

impl Default for AssignmentStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AssignmentStatus::Draft => "DRAFT",
            AssignmentStatus::Active => "ACTIVE",
            AssignmentStatus::Graded => "GRADED",
        };
        write!(f, "{s}")
    }
}

/// Where the post-deadline grading workflow currently stands for an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum GradingStage {
    #[sea_orm(string_value = "AWAITING_DEADLINE")]
    AwaitingDeadline,
    #[sea_orm(string_value = "PLAGIARISM_PENDING")]
    PlagiarismPending,
    #[sea_orm(string_value = "RAG_PENDING")]
    RagPending,
    #[sea_orm(string_value = "FINALIZING")]
    Finalizing,
    #[sea_orm(string_value = "GRADED")]
    Graded,
}

impl Default for GradingStage {
    fn default() -> Self {
        Self::AwaitingDeadline
    }
}

impl fmt::Display for GradingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GradingStage::AwaitingDeadline => "AWAITING_DEADLINE",
            GradingStage::PlagiarismPending => "PLAGIARISM_PENDING",
            GradingStage::RagPending => "RAG_PENDING",
            GradingStage::Finalizing => "FINALIZING",
            GradingStage::Graded => "GRADED",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "assignments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub title: String,
    /// Submissions close at this instant; grading may start from here on.
    pub deadline: DateTime<Utc>,
    pub status: AssignmentStatus,
    pub grading_stage: GradingStage,
    /// Collection name on the RAG service. `None` until training completes.
    pub rag_collection: Option<String>,
    pub rag_trained_at: Option<DateTime<Utc>>,
    /// Reference document the collection is trained from.
    pub resource_path: Option<String>,
    pub graded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::assignment_submission::Entity")]
    Submissions,
}

impl Related<super::assignment_submission::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Submissions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_deadline_passed(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline
    }
}

impl Entity {
    /// Insert a new DRAFT assignment.
    pub async fn create_assignment<C: ConnectionTrait>(
        db: &C,
        title: &str,
        deadline: DateTime<Utc>,
        resource_path: Option<&str>,
    ) -> Result<Model, DbErr> {
        let now = Utc::now();
        ActiveModel {
            title: Set(title.to_string()),
            deadline: Set(deadline),
            status: Set(AssignmentStatus::Draft),
            grading_stage: Set(GradingStage::AwaitingDeadline),
            rag_collection: Set(None),
            rag_trained_at: Set(None),
            resource_path: Set(resource_path.map(str::to_string)),
            graded_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    /// Record the grading stage an orchestration has reached.
    pub async fn set_grading_stage<C: ConnectionTrait>(
        db: &C,
        assignment_id: i64,
        stage: GradingStage,
    ) -> Result<Model, DbErr> {
        let model = Entity::find_by_id(assignment_id)
            .one(db)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("assignment {assignment_id}")))?;
        let mut am = model.into_active_model();
        am.grading_stage = Set(stage);
        am.updated_at = Set(Utc::now());
        am.update(db).await
    }
}
