use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::sea_orm_active_enums::{ApprovalRequestType, ApprovalStatus};

/// A pending or resolved parent decision over one purchase intent.
/// Resolved at most once; the unique `transaction_id` column caps each
/// approval at exactly one created transaction.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "approval_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub student_id: Uuid,
    pub parent_id: Uuid,
    pub budget_policy_id: Option<Uuid>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub amount: Decimal,
    pub description: String,
    pub request_type: ApprovalRequestType,
    pub status: ApprovalStatus,
    pub expires_at: TimeDateTimeWithTimeZone,
    pub parent_response: Option<String>,
    pub resolved_at: Option<TimeDateTimeWithTimeZone>,
    pub pricing_plan_id: Option<Uuid>,
    pub session_id: Option<Uuid>,
    #[sea_orm(unique)]
    pub transaction_id: Option<Uuid>,
    pub created_at: TimeDateTimeWithTimeZone,
    pub updated_at: TimeDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::budget_policies::Entity",
        from = "Column::BudgetPolicyId",
        to = "super::budget_policies::Column::Id"
    )]
    BudgetPolicies,
    #[sea_orm(
        belongs_to = "super::transactions::Entity",
        from = "Column::TransactionId",
        to = "super::transactions::Column::Id"
    )]
    Transactions,
    #[sea_orm(
        belongs_to = "super::pricing_plans::Entity",
        from = "Column::PricingPlanId",
        to = "super::pricing_plans::Column::Id"
    )]
    PricingPlans,
}

impl Related<super::budget_policies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BudgetPolicies.def()
    }
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
