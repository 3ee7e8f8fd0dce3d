//! Role entity for SeaORM. Permissions are stored as a JSON array.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "roles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    pub permissions: Json,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for atrium_core::domain::Role {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            permissions: serde_json::from_value(model.permissions).unwrap_or_default(),
            created_at: model.created_at.into(),
        }
    }
}

impl From<atrium_core::domain::Role> for ActiveModel {
    fn from(role: atrium_core::domain::Role) -> Self {
        Self {
            id: Set(role.id),
            name: Set(role.name),
            permissions: Set(serde_json::json!(role.permissions)),
            created_at: Set(role.created_at.into()),
        }
    }
}
