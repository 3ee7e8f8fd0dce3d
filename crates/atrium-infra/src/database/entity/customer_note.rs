//! Customer note entity for SeaORM.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "customer_notes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub customer_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for atrium_core::domain::CustomerNote {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            customer_id: model.customer_id,
            author_id: model.author_id,
            content: model.content,
            created_at: model.created_at.into(),
        }
    }
}

impl From<atrium_core::domain::CustomerNote> for ActiveModel {
    fn from(note: atrium_core::domain::CustomerNote) -> Self {
        Self {
            id: Set(note.id),
            customer_id: Set(note.customer_id),
            author_id: Set(note.author_id),
            content: Set(note.content),
            created_at: Set(note.created_at.into()),
        }
    }
}
