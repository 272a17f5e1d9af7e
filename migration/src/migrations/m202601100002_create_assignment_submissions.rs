use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202601100002_create_assignment_submissions"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("assignment_submissions"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("assignment_id"))
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Alias::new("student_id")).big_integer().not_null())
                    .col(ColumnDef::new(Alias::new("file_path")).string().null())
                    .col(ColumnDef::new(Alias::new("submitted_at")).timestamp().null())
                    .col(
                        ColumnDef::new(Alias::new("status"))
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Alias::new("extracted_text")).text().null())
                    .col(
                        ColumnDef::new(Alias::new("ocr_status"))
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Alias::new("ocr_error")).text().null())
                    .col(ColumnDef::new(Alias::new("plagiarism_similarity")).double().null())
                    .col(ColumnDef::new(Alias::new("plagiarism_score")).double().null())
                    .col(ColumnDef::new(Alias::new("plagiarism_status")).string().null())
                    .col(ColumnDef::new(Alias::new("correctness_score")).double().null())
                    .col(
                        ColumnDef::new(Alias::new("correctness_status"))
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Alias::new("correctness_error")).text().null())
                    .col(ColumnDef::new(Alias::new("marks")).double().null())
                    .col(ColumnDef::new(Alias::new("final_score")).double().null())
                    .col(
                        ColumnDef::new(Alias::new("created_at"))
                            .timestamp()
                            .not_null()
                            .default(Expr::cust("CURRENT_TIMESTAMP")),
                    )
                    .col(
                        ColumnDef::new(Alias::new("updated_at"))
                            .timestamp()
                            .not_null()
                            .default(Expr::cust("CURRENT_TIMESTAMP")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_submissions_assignment")
                            .from(
                                Alias::new("assignment_submissions"),
                                Alias::new("assignment_id"),
                            )
                            .to(Alias::new("assignments"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_submissions_assignment_student")
                    .table(Alias::new("assignment_submissions"))
                    .col(Alias::new("assignment_id"))
                    .col(Alias::new("student_id"))
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(Alias::new("assignment_submissions"))
                    .to_owned(),
            )
            .await
    }
}
