//! Appointment entity for SeaORM.

use sea_orm::Set;
use sea_orm::entity::prelude::*;

use atrium_core::domain::AppointmentStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "appointments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub customer_id: Uuid,
    pub assigned_to: Option<Uuid>,
    pub title: String,
    pub scheduled_at: DateTimeWithTimeZone,
    pub duration_minutes: i32,
    pub status: String,
    pub cancel_reason: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for atrium_core::domain::Appointment {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            customer_id: model.customer_id,
            assigned_to: model.assigned_to,
            title: model.title,
            scheduled_at: model.scheduled_at.into(),
            duration_minutes: model.duration_minutes.max(0) as u32,
            status: model.status.parse().unwrap_or(AppointmentStatus::Scheduled),
            cancel_reason: model.cancel_reason,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

impl From<atrium_core::domain::Appointment> for ActiveModel {
    fn from(appointment: atrium_core::domain::Appointment) -> Self {
        Self {
            id: Set(appointment.id),
            customer_id: Set(appointment.customer_id),
            assigned_to: Set(appointment.assigned_to),
            title: Set(appointment.title),
            scheduled_at: Set(appointment.scheduled_at.into()),
            duration_minutes: Set(appointment.duration_minutes as i32),
            status: Set(appointment.status.as_str().to_string()),
            cancel_reason: Set(appointment.cancel_reason),
            created_at: Set(appointment.created_at.into()),
            updated_at: Set(appointment.updated_at.into()),
        }
    }
}
