//! Project entity for SeaORM.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

use atrium_core::domain::ProjectStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub customer_id: Uuid,
    pub name: String,
    pub description: String,
    pub status: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for atrium_core::domain::Project {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            customer_id: model.customer_id,
            name: model.name,
            description: model.description,
            status: model.status.parse().unwrap_or(ProjectStatus::Active),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<atrium_core::domain::Project> for ActiveModel {
    fn from(project: atrium_core::domain::Project) -> Self {
        Self {
            id: Set(project.id),
            customer_id: Set(project.customer_id),
            name: Set(project.name),
            description: Set(project.description),
            status: Set(project.status.as_str().to_string()),
            created_at: Set(project.created_at.into()),
            updated_at: Set(project.updated_at.into()),
        }
    }
}
