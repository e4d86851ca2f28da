use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One credit application per completed transaction. The unique index on
/// `transaction_id` is what makes ledger crediting idempotent under
/// duplicate gateway confirmations.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ledger_credits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub ledger_id: Uuid,
    #[sea_orm(unique)]
    pub transaction_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub hours_credited: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub amount_credited: Decimal,
    pub created_at: TimeDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::hour_ledgers::Entity",
        from = "Column::LedgerId",
        to = "super::hour_ledgers::Column::Id"
    )]
    HourLedgers,
    #[sea_orm(
        belongs_to = "super::transactions::Entity",
        from = "Column::TransactionId",
        to = "super::transactions::Column::Id"
    )]
    Transactions,
}

impl Related<super::hour_ledgers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::HourLedgers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
