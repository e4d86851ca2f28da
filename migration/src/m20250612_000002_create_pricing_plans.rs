use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PricingPlans::Table)
                    .if_not_exists()
                    .col(pk_uuid(PricingPlans::Id))
                    .col(string(PricingPlans::Name))
                    .col(decimal_len(PricingPlans::HoursIncluded, 12, 2))
                    .col(decimal_len(PricingPlans::Price, 12, 2))
                    .col(integer_null(PricingPlans::ValidityDays))
                    .col(boolean(PricingPlans::IsActive).default(true))
                    .col(
                        timestamp_with_time_zone(PricingPlans::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PricingPlans::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PricingPlans {
    Table,
    Id,
    Name,
    HoursIncluded,
    Price,
    ValidityDays,
    IsActive,
    CreatedAt,
}
