use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-student running balance of purchased vs consumed tutoring hours,
/// plus a monetary balance for non-hour-denominated credits.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "hour_ledgers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub student_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub hours_purchased: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub hours_consumed: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub balance_amount: Decimal,
    pub created_at: TimeDateTimeWithTimeZone,
    pub updated_at: TimeDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::consumption_records::Entity")]
    ConsumptionRecords,
    #[sea_orm(has_many = "super::ledger_credits::Entity")]
    LedgerCredits,
}

impl Related<super::consumption_records::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ConsumptionRecords.def()
    }
}

impl Related<super::ledger_credits::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LedgerCredits.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
