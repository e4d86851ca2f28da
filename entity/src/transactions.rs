use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::sea_orm_active_enums::{TransactionKind, TransactionStatus};

/// One purchase attempt: an hours package, a subscription renewal, or a
/// single-session topup. Rows are never hard-deleted.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub student_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    /// Tutoring hours this transaction buys; zero for pure monetary topups.
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub hours_quantity: Decimal,
    pub pricing_plan_id: Option<Uuid>,
    /// Opaque reference handed back by the payment gateway; null until it responds.
    #[sea_orm(unique)]
    pub gateway_reference: Option<String>,
    pub expires_at: Option<TimeDateTimeWithTimeZone>,
    /// Free-form display hints only; business logic never reads this.
    pub metadata: Option<Json>,
    pub created_at: TimeDateTimeWithTimeZone,
    pub updated_at: TimeDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::pricing_plans::Entity",
        from = "Column::PricingPlanId",
        to = "super::pricing_plans::Column::Id"
    )]
    PricingPlans,
    #[sea_orm(has_many = "super::consumption_records::Entity")]
    ConsumptionRecords,
}

impl Related<super::pricing_plans::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PricingPlans.def()
    }
}

impl Related<super::consumption_records::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ConsumptionRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
