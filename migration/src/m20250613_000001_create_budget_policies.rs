use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Spending guardrails, one row per parent-child relationship.
        // Null limits mean unlimited; deactivation preserves history.
        manager
            .create_table(
                Table::create()
                    .table(BudgetPolicies::Table)
                    .if_not_exists()
                    .col(pk_uuid(BudgetPolicies::Id))
                    .col(uuid(BudgetPolicies::GuardianLinkId))
                    .col(decimal_len_null(BudgetPolicies::MonthlyLimit, 12, 2))
                    .col(decimal_len_null(BudgetPolicies::WeeklyLimit, 12, 2))
                    .col(
                        decimal_len(BudgetPolicies::AutoApprovalThreshold, 12, 2)
                            .default(Expr::value("0.00")),
                    )
                    .col(boolean(BudgetPolicies::RequireApprovalForSessions).default(true))
                    .col(boolean(BudgetPolicies::RequireApprovalForPackages).default(true))
                    .col(boolean(BudgetPolicies::IsActive).default(true))
                    .col(
                        timestamp_with_time_zone(BudgetPolicies::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(BudgetPolicies::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_budget_policies_guardian_link")
                            .from(BudgetPolicies::Table, BudgetPolicies::GuardianLinkId)
                            .to(GuardianLinks::Table, GuardianLinks::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_budget_policies_guardian_link")
                    .table(BudgetPolicies::Table)
                    .col(BudgetPolicies::GuardianLinkId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BudgetPolicies::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum BudgetPolicies {
    Table,
    Id,
    GuardianLinkId,
    MonthlyLimit,
    WeeklyLimit,
    AutoApprovalThreshold,
    RequireApprovalForSessions,
    RequireApprovalForPackages,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum GuardianLinks {
    Table,
    Id,
}
