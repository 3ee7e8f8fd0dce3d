//! Inbound contact request handlers.

use actix_web::{HttpResponse, web};
use chrono::Utc;
use uuid::Uuid;

use atrium_core::domain::{Appointment, ContactRequest, Customer, RequestStatus};
use atrium_shared::ApiResponse;
use atrium_shared::dto::{
    AssignRequest, ContactRequestQuery, ContactRequestStats, ConvertRequest, CreateContactRequest,
    UpdateContactRequest,
};

use crate::handlers::{mappers, parse_status};
use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

async fn load(state: &AppState, id: Uuid) -> AppResult<ContactRequest> {
    state
        .requests
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Contact request {id}")))
}

/// GET /api/requests
pub async fn list(
    _identity: Identity,
    state: web::Data<AppState>,
    query: web::Query<ContactRequestQuery>,
) -> AppResult<HttpResponse> {
    let status = parse_status::<RequestStatus>(&query.status)?;
    let page = state
        .requests
        .list(
            query.limit,
            query.offset,
            status,
            query.assigned,
            query.assigned_to,
        )
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(mappers::paged(
        page,
        query.limit,
        query.offset,
        mappers::request_dto,
    ))))
}

/// GET /api/requests/{id}
pub async fn get(
    _identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let request = load(&state, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(mappers::request_dto(&request))))
}

/// POST /api/requests
///
/// Public: this is what the website contact form posts to.
pub async fn create(
    state: web::Data<AppState>,
    body: web::Json<CreateContactRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    if req.name.trim().is_empty() || req.subject.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Name and subject must not be empty".to_string(),
        ));
    }
    if req.email.is_empty() || !req.email.contains('@') {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }

    let request = ContactRequest::new(req.name, req.email, req.subject, req.body);
    let saved = state.requests.save(request).await?;

    tracing::info!(request_id = %saved.id, "Contact request received");

    Ok(HttpResponse::Created().json(ApiResponse::ok(mappers::request_dto(&saved))))
}

/// PATCH /api/requests/{id}
pub async fn update(
    _identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateContactRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let mut request = load(&state, path.into_inner()).await?;

    if let Some(subject) = req.subject {
        request.subject = subject;
    }
    if let Some(request_body) = req.body {
        request.body = request_body;
    }
    if let Some(status) = parse_status::<RequestStatus>(&req.status)? {
        request.status = status;
    }
    request.updated_at = Utc::now();

    let saved = state.requests.save(request).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(mappers::request_dto(&saved))))
}

/// POST /api/requests/{id}/assign
pub async fn assign(
    _identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<AssignRequest>,
) -> AppResult<HttpResponse> {
    let assignee = state
        .users
        .find_by_id(body.user_id)
        .await?
        .ok_or_else(|| AppError::BadRequest("Assignee does not exist".to_string()))?;

    let mut request = load(&state, path.into_inner()).await?;
    request.assign(assignee.id);
    let saved = state.requests.save(request).await?;

    tracing::info!(request_id = %saved.id, assignee = %assignee.id, "Contact request assigned");

    Ok(HttpResponse::Ok().json(ApiResponse::ok(mappers::request_dto(&saved))))
}

/// POST /api/requests/{id}/convert
///
/// Turn an inbound request into a scheduled appointment. The requester
/// becomes a customer record if none matches their email yet.
pub async fn convert(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<ConvertRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    if req.duration_minutes == 0 {
        return Err(AppError::BadRequest(
            "Duration must be positive".to_string(),
        ));
    }

    let mut request = load(&state, path.into_inner()).await?;
    if request.status == RequestStatus::Deleted {
        return Err(AppError::BadRequest(
            "Cannot convert a deleted request".to_string(),
        ));
    }

    let customer = match state.customers.find_by_email(&request.email).await? {
        Some(existing) => existing,
        None => {
            let customer =
                Customer::new(request.name.clone(), request.email.clone(), None, None);
            state.customers.save(customer).await?
        }
    };

    let assigned_to = request.assigned_to.or(Some(identity.user_id));
    let appointment = Appointment::new(
        customer.id,
        assigned_to,
        req.title,
        req.scheduled_at,
        req.duration_minutes,
    );
    let saved = state.appointments.save(appointment).await?;

    request.status = RequestStatus::Resolved;
    request.updated_at = Utc::now();
    state.requests.save(request).await?;

    tracing::info!(
        appointment_id = %saved.id,
        customer_id = %customer.id,
        "Contact request converted to appointment"
    );

    Ok(HttpResponse::Created().json(ApiResponse::ok(mappers::appointment_dto(&saved))))
}

/// Aggregate counts, shared with the dashboard.
pub(crate) async fn compute_stats(state: &AppState) -> AppResult<ContactRequestStats> {
    Ok(ContactRequestStats {
        total: state.requests.count(None).await?,
        new: state.requests.count(Some(RequestStatus::New)).await?,
        in_progress: state.requests.count(Some(RequestStatus::InProgress)).await?,
        resolved: state.requests.count(Some(RequestStatus::Resolved)).await?,
        unassigned: state.requests.count_unassigned().await?,
    })
}

/// GET /api/requests/stats
pub async fn stats(_identity: Identity, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let stats = compute_stats(&state).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(stats)))
}
