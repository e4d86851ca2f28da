use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Parent-child relationship rows. Owned by the identity subsystem;
/// this core only reads them to resolve the responsible parent and the
/// budget policy in effect.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "guardian_links")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub parent_id: Uuid,
    pub student_id: Uuid,
    pub is_active: bool,
    pub created_at: TimeDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::budget_policies::Entity")]
    BudgetPolicies,
}

impl Related<super::budget_policies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BudgetPolicies.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
