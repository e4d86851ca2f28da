use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Parent-configured spending guardrails for one parent-child
/// relationship. Null limits mean unlimited. Policies are deactivated,
/// never deleted.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "budget_policies")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub guardian_link_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))", nullable)]
    pub monthly_limit: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))", nullable)]
    pub weekly_limit: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub auto_approval_threshold: Decimal,
    pub require_approval_for_sessions: bool,
    pub require_approval_for_packages: bool,
    pub is_active: bool,
    pub created_at: TimeDateTimeWithTimeZone,
    pub updated_at: TimeDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::guardian_links::Entity",
        from = "Column::GuardianLinkId",
        to = "super::guardian_links::Column::Id"
    )]
    GuardianLinks,
    #[sea_orm(has_many = "super::approval_requests::Entity")]
    ApprovalRequests,
}

impl Related<super::guardian_links::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GuardianLinks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
