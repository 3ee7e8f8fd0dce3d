//! Domain -> DTO mapping, done once at the handler boundary.

use atrium_core::domain::{
    Appointment, ContactRequest, Customer, CustomerNote, Project, Role, User,
};
use atrium_core::ports::Page;
use atrium_shared::dto::{
    AppointmentDto, ContactRequestDto, CustomerDto, CustomerNoteDto, Paged, ProjectDto, RoleDto,
    UserDto,
};

pub fn user_dto(user: &User, role_name: &str) -> UserDto {
    UserDto {
        id: user.id,
        email: user.email.clone(),
        display_name: user.display_name.clone(),
        role: role_name.to_string(),
        status: user.status.to_string(),
        created_at: user.created_at,
    }
}

pub fn role_dto(role: &Role) -> RoleDto {
    RoleDto {
        id: role.id,
        name: role.name.clone(),
        permissions: role.permissions.clone(),
    }
}

pub fn customer_dto(customer: &Customer) -> CustomerDto {
    CustomerDto {
        id: customer.id,
        name: customer.name.clone(),
        email: customer.email.clone(),
        phone: customer.phone.clone(),
        company: customer.company.clone(),
        status: customer.status.to_string(),
        created_at: customer.created_at,
        updated_at: customer.updated_at,
    }
}

pub fn note_dto(note: &CustomerNote) -> CustomerNoteDto {
    CustomerNoteDto {
        id: note.id,
        author_id: note.author_id,
        content: note.content.clone(),
        created_at: note.created_at,
    }
}

pub fn request_dto(request: &ContactRequest) -> ContactRequestDto {
    ContactRequestDto {
        id: request.id,
        name: request.name.clone(),
        email: request.email.clone(),
        subject: request.subject.clone(),
        body: request.body.clone(),
        status: request.status.to_string(),
        assigned_to: request.assigned_to,
        created_at: request.created_at,
        updated_at: request.updated_at,
    }
}

pub fn appointment_dto(appointment: &Appointment) -> AppointmentDto {
    AppointmentDto {
        id: appointment.id,
        customer_id: appointment.customer_id,
        assigned_to: appointment.assigned_to,
        title: appointment.title.clone(),
        scheduled_at: appointment.scheduled_at,
        duration_minutes: appointment.duration_minutes,
        status: appointment.status.to_string(),
        cancel_reason: appointment.cancel_reason.clone(),
        created_at: appointment.created_at,
    }
}

pub fn project_dto(project: &Project) -> ProjectDto {
    ProjectDto {
        id: project.id,
        customer_id: project.customer_id,
        name: project.name.clone(),
        description: project.description.clone(),
        status: project.status.to_string(),
        created_at: project.created_at,
        updated_at: project.updated_at,
    }
}

/// Map a repository page into the wire shape.
pub fn paged<T, U>(page: Page<T>, limit: u64, offset: u64, map: impl Fn(&T) -> U) -> Paged<U> {
    Paged {
        items: page.items.iter().map(map).collect(),
        total: page.total,
        limit,
        offset,
    }
}
