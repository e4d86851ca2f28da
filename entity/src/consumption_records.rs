use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Links consumed hours back to the transaction they were purchased
/// under, so a refund reverses exactly one package's hours. Amounts are
/// immutable after insert; only the refund flag and reason may change.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "consumption_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub ledger_id: Uuid,
    pub transaction_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub hours_consumed: Decimal,
    /// Hours held at booking time; may exceed `hours_consumed` when a
    /// session ran short of its reservation.
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub hours_reserved: Decimal,
    /// Booking-subsystem context for this deduction.
    pub session_id: Option<Uuid>,
    pub is_refunded: bool,
    pub refund_reason: Option<String>,
    pub refunded_at: Option<TimeDateTimeWithTimeZone>,
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

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
