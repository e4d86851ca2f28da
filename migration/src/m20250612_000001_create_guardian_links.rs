use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Parent-child relationship rows; managed by the identity subsystem,
        // read here to resolve the responsible parent for a student.
        manager
            .create_table(
                Table::create()
                    .table(GuardianLinks::Table)
                    .if_not_exists()
                    .col(pk_uuid(GuardianLinks::Id))
                    .col(uuid(GuardianLinks::ParentId))
                    .col(uuid(GuardianLinks::StudentId))
                    .col(boolean(GuardianLinks::IsActive).default(true))
                    .col(
                        timestamp_with_time_zone(GuardianLinks::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_guardian_links_parent_student")
                    .table(GuardianLinks::Table)
                    .col(GuardianLinks::ParentId)
                    .col(GuardianLinks::StudentId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_guardian_links_student")
                    .table(GuardianLinks::Table)
                    .col(GuardianLinks::StudentId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GuardianLinks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum GuardianLinks {
    Table,
    Id,
    ParentId,
    StudentId,
    IsActive,
    CreatedAt,
}
