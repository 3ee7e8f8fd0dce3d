//! Contact request entity for SeaORM.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

use atrium_core::domain::RequestStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "contact_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub body: String,
    pub status: String,
    pub assigned_to: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for atrium_core::domain::ContactRequest {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            subject: model.subject,
            body: model.body,
            status: model.status.parse().unwrap_or(RequestStatus::New),
            assigned_to: model.assigned_to,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<atrium_core::domain::ContactRequest> for ActiveModel {
    fn from(request: atrium_core::domain::ContactRequest) -> Self {
        Self {
            id: Set(request.id),
            name: Set(request.name),
            email: Set(request.email),
            subject: Set(request.subject),
            body: Set(request.body),
            status: Set(request.status.as_str().to_string()),
            assigned_to: Set(request.assigned_to),
            created_at: Set(request.created_at.into()),
            updated_at: Set(request.updated_at.into()),
        }
    }
}
