use crate::error::Result;
use sea_orm::{entity::*, query::*, DatabaseConnection};
use uuid::Uuid;

/// Read-only lookups over the identity subsystem's relationship data.
/// This core never creates or edits guardian links.
pub struct RelationshipDirectory {
    db: DatabaseConnection,
}

impl RelationshipDirectory {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The responsible parent for a student, if any.
    pub async fn get_parent(&self, student_id: Uuid) -> Result<Option<Uuid>> {
        let link = self.active_link(student_id).await?;
        Ok(link.map(|link| link.parent_id))
    }

    /// The active budget policy covering a student, together with the
    /// relationship it hangs off.
    pub async fn get_active_policy(
        &self,
        student_id: Uuid,
    ) -> Result<Option<(entity::guardian_links::Model, entity::budget_policies::Model)>> {
        let Some(link) = self.active_link(student_id).await? else {
            return Ok(None);
        };

        let policy = entity::budget_policies::Entity::find()
            .filter(entity::budget_policies::Column::GuardianLinkId.eq(link.id))
            .filter(entity::budget_policies::Column::IsActive.eq(true))
            .one(&self.db)
            .await?;

        Ok(policy.map(|policy| (link, policy)))
    }

    async fn active_link(&self, student_id: Uuid) -> Result<Option<entity::guardian_links::Model>> {
        let link = entity::guardian_links::Entity::find()
            .filter(entity::guardian_links::Column::StudentId.eq(student_id))
            .filter(entity::guardian_links::Column::IsActive.eq(true))
            .order_by_asc(entity::guardian_links::Column::CreatedAt)
            .one(&self.db)
            .await?;

        Ok(link)
    }
}
