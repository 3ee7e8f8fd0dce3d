//! Customer entity for SeaORM.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

use atrium_core::domain::EntityStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "customers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub status: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for atrium_core::domain::Customer {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            phone: model.phone,
            company: model.company,
            status: model.status.parse().unwrap_or(EntityStatus::Inactive),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<atrium_core::domain::Customer> for ActiveModel {
    fn from(customer: atrium_core::domain::Customer) -> Self {
        Self {
            id: Set(customer.id),
            name: Set(customer.name),
            email: Set(customer.email),
            phone: Set(customer.phone),
            company: Set(customer.company),
            status: Set(customer.status.as_str().to_string()),
            created_at: Set(customer.created_at.into()),
            updated_at: Set(customer.updated_at.into()),
        }
    }
}
