//! Assignment setup: training the reference collection and going live.

use crate::clients::RagClient;
use crate::clients::rag::collection_name;
use crate::error::{GradingError, GradingResult};
use crate::scheduler;
use chrono::{DateTime, Utc};
use db::models::assignment::{self, AssignmentStatus};
use db::models::scheduled_task;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, DatabaseConnection, EntityTrait, IntoActiveModel,
    QuerySelect, TransactionTrait,
};
use std::path::Path;
use tracing::info;

async fn find_assignment(
    db: &DatabaseConnection,
    assignment_id: i64,
) -> GradingResult<assignment::Model> {
    assignment::Entity::find_by_id(assignment_id)
        .one(db)
        .await?
        .ok_or_else(|| GradingError::DataIntegrity(format!("assignment {assignment_id} not found")))
}

/// Train the assignment's collection from its resource document and record it.
pub async fn train_collection(
    db: &DatabaseConnection,
    rag: &RagClient,
    assignment_id: i64,
) -> GradingResult<assignment::Model> {
    let model = find_assignment(db, assignment_id).await?;
    let resource = model.resource_path.as_deref().ok_or_else(|| {
        GradingError::Validation(format!("assignment {assignment_id} has no resource document"))
    })?;

    let name = collection_name(assignment_id);
    rag.train(Path::new(resource), &name).await?;

    let now = Utc::now();
    let mut am = model.into_active_model();
    am.rag_collection = Set(Some(name.clone()));
    am.rag_trained_at = Set(Some(now));
    am.updated_at = Set(now);
    let updated = am.update(db).await?;

    info!(assignment_id, collection = %name, "Trained reference collection");
    Ok(updated)
}

/// Drop the assignment's collection on the scoring service and forget it locally.
/// Returns `false` when the assignment never had one.
pub async fn delete_collection(
    db: &DatabaseConnection,
    rag: &RagClient,
    assignment_id: i64,
) -> GradingResult<bool> {
    let model = find_assignment(db, assignment_id).await?;
    let Some(name) = model.rag_collection.clone() else {
        return Ok(false);
    };

    rag.delete_collection(&name).await?;

    let mut am = model.into_active_model();
    am.rag_collection = Set(None);
    am.rag_trained_at = Set(None);
    am.updated_at = Set(Utc::now());
    am.update(db).await?;

    info!(assignment_id, collection = %name, "Deleted reference collection");
    Ok(true)
}

/// Move a DRAFT assignment to ACTIVE and schedule its post-deadline evaluation.
/// Both writes commit together.
pub async fn activate_assignment(
    db: &DatabaseConnection,
    assignment_id: i64,
    now: DateTime<Utc>,
) -> GradingResult<(assignment::Model, scheduled_task::Model)> {
    let txn = db.begin().await?;
    let model = assignment::Entity::find_by_id(assignment_id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or_else(|| GradingError::DataIntegrity(format!("assignment {assignment_id} not found")))?;

    if !model.status.can_transition_to(AssignmentStatus::Active) {
        return Err(GradingError::Validation(format!(
            "assignment {assignment_id} is {} and cannot be activated",
            model.status
        )));
    }

    let mut am = model.into_active_model();
    am.status = Set(AssignmentStatus::Active);
    am.updated_at = Set(now);
    let activated = am.update(&txn).await?;

    let timer = scheduler::schedule_assignment_evaluation(&txn, &activated, now).await?;
    txn.commit().await?;

    info!(assignment_id, run_at = %timer.run_at, "Assignment activated");
    Ok((activated, timer))
}
