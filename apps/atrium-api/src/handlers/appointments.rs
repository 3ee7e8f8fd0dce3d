//! Appointment scheduling handlers.

use actix_web::{HttpResponse, web};
use chrono::Utc;
use uuid::Uuid;

use atrium_core::domain::{Appointment, AppointmentStatus};
use atrium_shared::ApiResponse;
use atrium_shared::dto::{
    AppointmentQuery, AppointmentStats, CancelAppointmentRequest, CreateAppointmentRequest,
    UpdateAppointmentRequest,
};

use crate::handlers::{mappers, parse_status};
use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

async fn load(state: &AppState, id: Uuid) -> AppResult<Appointment> {
    state
        .appointments
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Appointment {id}")))
}

/// GET /api/appointments
pub async fn list(
    _identity: Identity,
    state: web::Data<AppState>,
    query: web::Query<AppointmentQuery>,
) -> AppResult<HttpResponse> {
    let status = parse_status::<AppointmentStatus>(&query.status)?;
    let page = state
        .appointments
        .list(
            query.limit,
            query.offset,
            status,
            query.upcoming.unwrap_or(false),
        )
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(mappers::paged(
        page,
        query.limit,
        query.offset,
        mappers::appointment_dto,
    ))))
}

/// GET /api/appointments/{id}
pub async fn get(
    _identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let appointment = load(&state, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(mappers::appointment_dto(&appointment))))
}

/// POST /api/appointments
pub async fn create(
    _identity: Identity,
    state: web::Data<AppState>,
    body: web::Json<CreateAppointmentRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    if req.title.trim().is_empty() {
        return Err(AppError::BadRequest("Title must not be empty".to_string()));
    }
    if req.duration_minutes == 0 {
        return Err(AppError::BadRequest(
            "Duration must be positive".to_string(),
        ));
    }
    if state.customers.find_by_id(req.customer_id).await?.is_none() {
        return Err(AppError::BadRequest("Customer does not exist".to_string()));
    }
    if let Some(assignee) = req.assigned_to {
        if state.users.find_by_id(assignee).await?.is_none() {
            return Err(AppError::BadRequest("Assignee does not exist".to_string()));
        }
    }

    let appointment = Appointment::new(
        req.customer_id,
        req.assigned_to,
        req.title,
        req.scheduled_at,
        req.duration_minutes,
    );
    let saved = state.appointments.save(appointment).await?;

    tracing::info!(appointment_id = %saved.id, "Appointment scheduled");

    Ok(HttpResponse::Created().json(ApiResponse::ok(mappers::appointment_dto(&saved))))
}

/// PATCH /api/appointments/{id}
pub async fn update(
    _identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateAppointmentRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let mut appointment = load(&state, path.into_inner()).await?;

    if appointment.status == AppointmentStatus::Cancelled {
        return Err(AppError::BadRequest(
            "Cancelled appointments cannot be changed".to_string(),
        ));
    }

    if let Some(title) = req.title {
        if title.trim().is_empty() {
            return Err(AppError::BadRequest("Title must not be empty".to_string()));
        }
        appointment.title = title;
    }
    if let Some(scheduled_at) = req.scheduled_at {
        appointment.scheduled_at = scheduled_at;
    }
    if let Some(duration) = req.duration_minutes {
        if duration == 0 {
            return Err(AppError::BadRequest(
                "Duration must be positive".to_string(),
            ));
        }
        appointment.duration_minutes = duration;
    }
    if let Some(assignee) = req.assigned_to {
        if state.users.find_by_id(assignee).await?.is_none() {
            return Err(AppError::BadRequest("Assignee does not exist".to_string()));
        }
        appointment.assigned_to = Some(assignee);
    }
    appointment.updated_at = Utc::now();

    let saved = state.appointments.save(appointment).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(mappers::appointment_dto(&saved))))
}

/// POST /api/appointments/{id}/cancel
pub async fn cancel(
    _identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<CancelAppointmentRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    if req.reason.trim().is_empty() {
        return Err(AppError::BadRequest(
            "A cancellation reason is required".to_string(),
        ));
    }

    let mut appointment = load(&state, path.into_inner()).await?;
    if appointment.status == AppointmentStatus::Completed {
        return Err(AppError::BadRequest(
            "Completed appointments cannot be cancelled".to_string(),
        ));
    }

    appointment.cancel(req.reason);
    let saved = state.appointments.save(appointment).await?;

    tracing::info!(appointment_id = %saved.id, "Appointment cancelled");

    Ok(HttpResponse::Ok().json(ApiResponse::ok(mappers::appointment_dto(&saved))))
}

/// Aggregate counts, shared with the dashboard.
pub(crate) async fn compute_stats(state: &AppState) -> AppResult<AppointmentStats> {
    let upcoming = state.appointments.list(1, 0, None, true).await?.total;
    Ok(AppointmentStats {
        total: state.appointments.count(None).await?,
        scheduled: state
            .appointments
            .count(Some(AppointmentStatus::Scheduled))
            .await?,
        completed: state
            .appointments
            .count(Some(AppointmentStatus::Completed))
            .await?,
        cancelled: state
            .appointments
            .count(Some(AppointmentStatus::Cancelled))
            .await?,
        upcoming,
    })
}

/// GET /api/appointments/stats
pub async fn stats(_identity: Identity, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let stats = compute_stats(&state).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(stats)))
}
