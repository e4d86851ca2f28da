use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Parent sign-off records. The unique transaction_id index caps
        // each approval at exactly one created transaction.
        manager
            .create_table(
                Table::create()
                    .table(ApprovalRequests::Table)
                    .if_not_exists()
                    .col(pk_uuid(ApprovalRequests::Id))
                    .col(uuid(ApprovalRequests::StudentId))
                    .col(uuid(ApprovalRequests::ParentId))
                    .col(uuid_null(ApprovalRequests::BudgetPolicyId))
                    .col(decimal_len(ApprovalRequests::Amount, 12, 2))
                    .col(text(ApprovalRequests::Description))
                    .col(string_len(ApprovalRequests::RequestType, 32))
                    .col(string_len(ApprovalRequests::Status, 32))
                    .col(timestamp_with_time_zone(ApprovalRequests::ExpiresAt))
                    .col(text_null(ApprovalRequests::ParentResponse))
                    .col(timestamp_with_time_zone_null(ApprovalRequests::ResolvedAt))
                    .col(uuid_null(ApprovalRequests::PricingPlanId))
                    .col(uuid_null(ApprovalRequests::SessionId))
                    .col(uuid_null(ApprovalRequests::TransactionId))
                    .col(
                        timestamp_with_time_zone(ApprovalRequests::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(ApprovalRequests::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_approval_requests_budget_policy")
                            .from(ApprovalRequests::Table, ApprovalRequests::BudgetPolicyId)
                            .to(BudgetPolicies::Table, BudgetPolicies::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_approval_requests_transaction")
                            .from(ApprovalRequests::Table, ApprovalRequests::TransactionId)
                            .to(Transactions::Table, Transactions::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_approval_requests_transaction")
                    .table(ApprovalRequests::Table)
                    .col(ApprovalRequests::TransactionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Parent inbox scans pending requests by parent.
        manager
            .create_index(
                Index::create()
                    .name("idx_approval_requests_parent_status")
                    .table(ApprovalRequests::Table)
                    .col(ApprovalRequests::ParentId)
                    .col(ApprovalRequests::Status)
                    .to_owned(),
            )
            .await?;

        // The expiry sweep scans pending requests past their deadline.
        manager
            .create_index(
                Index::create()
                    .name("idx_approval_requests_status_expires")
                    .table(ApprovalRequests::Table)
                    .col(ApprovalRequests::Status)
                    .col(ApprovalRequests::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ApprovalRequests::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ApprovalRequests {
    Table,
    Id,
    StudentId,
    ParentId,
    BudgetPolicyId,
    Amount,
    Description,
    RequestType,
    Status,
    ExpiresAt,
    ParentResponse,
    ResolvedAt,
    PricingPlanId,
    SessionId,
    TransactionId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum BudgetPolicies {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
}
