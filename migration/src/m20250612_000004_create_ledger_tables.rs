use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One ledger per student; created lazily on first completed purchase.
        manager
            .create_table(
                Table::create()
                    .table(HourLedgers::Table)
                    .if_not_exists()
                    .col(pk_uuid(HourLedgers::Id))
                    .col(uuid(HourLedgers::StudentId))
                    .col(
                        decimal_len(HourLedgers::HoursPurchased, 12, 2)
                            .default(Expr::value("0.00")),
                    )
                    .col(
                        decimal_len(HourLedgers::HoursConsumed, 12, 2)
                            .default(Expr::value("0.00")),
                    )
                    .col(
                        decimal_len(HourLedgers::BalanceAmount, 12, 2)
                            .default(Expr::value("0.00")),
                    )
                    .col(
                        timestamp_with_time_zone(HourLedgers::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(HourLedgers::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_hour_ledgers_student")
                    .table(HourLedgers::Table)
                    .col(HourLedgers::StudentId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // One credit application per transaction; the unique index is the
        // idempotency guard against duplicate gateway confirmations.
        manager
            .create_table(
                Table::create()
                    .table(LedgerCredits::Table)
                    .if_not_exists()
                    .col(pk_uuid(LedgerCredits::Id))
                    .col(uuid(LedgerCredits::LedgerId))
                    .col(uuid(LedgerCredits::TransactionId))
                    .col(decimal_len(LedgerCredits::HoursCredited, 12, 2))
                    .col(decimal_len(LedgerCredits::AmountCredited, 12, 2))
                    .col(
                        timestamp_with_time_zone(LedgerCredits::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ledger_credits_ledger")
                            .from(LedgerCredits::Table, LedgerCredits::LedgerId)
                            .to(HourLedgers::Table, HourLedgers::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ledger_credits_transaction")
                            .from(LedgerCredits::Table, LedgerCredits::TransactionId)
                            .to(Transactions::Table, Transactions::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ledger_credits_transaction")
                    .table(LedgerCredits::Table)
                    .col(LedgerCredits::TransactionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Consumed-hours provenance. Amount columns are immutable after
        // insert; refunds only flip the flag and record a reason.
        manager
            .create_table(
                Table::create()
                    .table(ConsumptionRecords::Table)
                    .if_not_exists()
                    .col(pk_uuid(ConsumptionRecords::Id))
                    .col(uuid(ConsumptionRecords::LedgerId))
                    .col(uuid(ConsumptionRecords::TransactionId))
                    .col(decimal_len(ConsumptionRecords::HoursConsumed, 12, 2))
                    .col(decimal_len(ConsumptionRecords::HoursReserved, 12, 2))
                    .col(uuid_null(ConsumptionRecords::SessionId))
                    .col(boolean(ConsumptionRecords::IsRefunded).default(false))
                    .col(text_null(ConsumptionRecords::RefundReason))
                    .col(timestamp_with_time_zone_null(ConsumptionRecords::RefundedAt))
                    .col(
                        timestamp_with_time_zone(ConsumptionRecords::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_consumption_records_ledger")
                            .from(ConsumptionRecords::Table, ConsumptionRecords::LedgerId)
                            .to(HourLedgers::Table, HourLedgers::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_consumption_records_transaction")
                            .from(ConsumptionRecords::Table, ConsumptionRecords::TransactionId)
                            .to(Transactions::Table, Transactions::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_consumption_records_ledger")
                    .table(ConsumptionRecords::Table)
                    .col(ConsumptionRecords::LedgerId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ConsumptionRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LedgerCredits::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(HourLedgers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum HourLedgers {
    Table,
    Id,
    StudentId,
    HoursPurchased,
    HoursConsumed,
    BalanceAmount,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum LedgerCredits {
    Table,
    Id,
    LedgerId,
    TransactionId,
    HoursCredited,
    AmountCredited,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ConsumptionRecords {
    Table,
    Id,
    LedgerId,
    TransactionId,
    HoursConsumed,
    HoursReserved,
    SessionId,
    IsRefunded,
    RefundReason,
    RefundedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
}
