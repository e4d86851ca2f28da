use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Purchase attempts. Status strings are validated in application
        // code against the transaction state machine; rows are audit
        // records and are never deleted.
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(pk_uuid(Transactions::Id))
                    .col(uuid(Transactions::StudentId))
                    .col(decimal_len(Transactions::Amount, 12, 2))
                    .col(string_len(Transactions::Kind, 32))
                    .col(string_len(Transactions::Status, 32))
                    .col(
                        decimal_len(Transactions::HoursQuantity, 12, 2)
                            .default(Expr::value("0.00")),
                    )
                    .col(uuid_null(Transactions::PricingPlanId))
                    .col(string_null(Transactions::GatewayReference))
                    .col(timestamp_with_time_zone_null(Transactions::ExpiresAt))
                    .col(json_binary_null(Transactions::Metadata))
                    .col(
                        timestamp_with_time_zone(Transactions::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Transactions::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_pricing_plan")
                            .from(Transactions::Table, Transactions::PricingPlanId)
                            .to(PricingPlans::Table, PricingPlans::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Gateway references must map back to exactly one transaction.
        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_gateway_reference")
                    .table(Transactions::Table)
                    .col(Transactions::GatewayReference)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Budget evaluation scans completed spend per student by period.
        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_student_status_created")
                    .table(Transactions::Table)
                    .col(Transactions::StudentId)
                    .col(Transactions::Status)
                    .col(Transactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
    StudentId,
    Amount,
    Kind,
    Status,
    HoursQuantity,
    PricingPlanId,
    GatewayReference,
    ExpiresAt,
    Metadata,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PricingPlans {
    Table,
    Id,
}
