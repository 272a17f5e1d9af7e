//! One-shot timer records. Each row asks the scheduler beat to dispatch a named
//! task once `run_at` has passed; a row is disabled as soon as it is claimed.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveValue::Set, ConnectionTrait, QueryOrder};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "scheduled_tasks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Unique timer name, e.g. `evaluate_assignment_12`.
    #[sea_orm(unique)]
    pub name: String,
    /// Kind of work to dispatch, e.g. `evaluate_assignment`.
    pub task: String,
    pub run_at: DateTime<Utc>,
    /// JSON array of task arguments.
    #[sea_orm(column_type = "Text")]
    pub args: String,
    pub one_off: bool,
    pub enabled: bool,
    pub last_run_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Entity {
    pub async fn create_one_off<C: ConnectionTrait>(
        db: &C,
        name: &str,
        task: &str,
        run_at: DateTime<Utc>,
        args: serde_json::Value,
    ) -> Result<Model, DbErr> {
        ActiveModel {
            name: Set(name.to_string()),
            task: Set(task.to_string()),
            run_at: Set(run_at),
            args: Set(args.to_string()),
            one_off: Set(true),
            enabled: Set(true),
            last_run_at: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    pub async fn find_by_name<C: ConnectionTrait>(
        db: &C,
        name: &str,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find().filter(Column::Name.eq(name)).one(db).await
    }

    /// Enabled timers whose instant has passed, earliest first.
    pub async fn find_due<C: ConnectionTrait>(
        db: &C,
        now: DateTime<Utc>,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::Enabled.eq(true))
            .filter(Column::RunAt.lte(now))
            .order_by_asc(Column::RunAt)
            .all(db)
            .await
    }

    /// Atomically disable an enabled timer. Returns `true` only for the caller
    /// that flipped it, so a timer is dispatched at most once.
    pub async fn claim<C: ConnectionTrait>(
        db: &C,
        id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, DbErr> {
        let res = Entity::update_many()
            .col_expr(Column::Enabled, Expr::value(false))
            .col_expr(Column::LastRunAt, Expr::value(now))
            .filter(Column::Id.eq(id))
            .filter(Column::Enabled.eq(true))
            .exec(db)
            .await?;
        Ok(res.rows_affected == 1)
    }

    /// Re-enable a claimed timer so the next beat picks it up again.
    pub async fn release<C: ConnectionTrait>(db: &C, id: i64) -> Result<(), DbErr> {
        Entity::update_many()
            .col_expr(Column::Enabled, Expr::value(true))
            .filter(Column::Id.eq(id))
            .exec(db)
            .await?;
        Ok(())
    }

    pub async fn delete_by_name<C: ConnectionTrait>(db: &C, name: &str) -> Result<u64, DbErr> {
        let res = Entity::delete_many()
            .filter(Column::Name.eq(name))
            .exec(db)
            .await?;
        Ok(res.rows_affected)
    }
}

impl Model {
    /// Parse the stored argument list.
    pub fn args_json(&self) -> Result<Vec<serde_json::Value>, serde_json::Error> {
        serde_json::from_str(&self.args)
    }
}
