//! Customer (CRM) handlers.

use actix_web::{HttpResponse, web};
use chrono::Utc;
use uuid::Uuid;

use atrium_core::domain::{Customer, CustomerNote, EntityStatus};
use atrium_shared::ApiResponse;
use atrium_shared::dto::{
    AddNoteRequest, CreateCustomerRequest, CustomerStats, PageQuery, UpdateCustomerRequest,
};

use crate::handlers::{mappers, parse_status};
use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

async fn load(state: &AppState, id: Uuid) -> AppResult<Customer> {
    state
        .customers
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Customer {id}")))
}

/// GET /api/customers
pub async fn list(
    _identity: Identity,
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let status = parse_status::<EntityStatus>(&query.status)?;
    let page = state
        .customers
        .list(query.limit, query.offset, status)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(mappers::paged(
        page,
        query.limit,
        query.offset,
        mappers::customer_dto,
    ))))
}

/// GET /api/customers/{id}
pub async fn get(
    _identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let customer = load(&state, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(mappers::customer_dto(&customer))))
}

/// POST /api/customers
pub async fn create(
    _identity: Identity,
    state: web::Data<AppState>,
    body: web::Json<CreateCustomerRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    if req.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name must not be empty".to_string()));
    }
    if req.email.is_empty() || !req.email.contains('@') {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }

    let customer = Customer::new(req.name, req.email, req.phone, req.company);
    let saved = state.customers.save(customer).await?;

    tracing::info!(customer_id = %saved.id, "Customer created");

    Ok(HttpResponse::Created().json(ApiResponse::ok(mappers::customer_dto(&saved))))
}

/// PATCH /api/customers/{id}
pub async fn update(
    _identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateCustomerRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let mut customer = load(&state, path.into_inner()).await?;

    if let Some(name) = req.name {
        if name.trim().is_empty() {
            return Err(AppError::BadRequest("Name must not be empty".to_string()));
        }
        customer.name = name;
    }
    if let Some(email) = req.email {
        if !email.contains('@') {
            return Err(AppError::BadRequest("Invalid email address".to_string()));
        }
        customer.email = email;
    }
    if let Some(phone) = req.phone {
        customer.phone = Some(phone);
    }
    if let Some(company) = req.company {
        customer.company = Some(company);
    }
    if let Some(status) = parse_status::<EntityStatus>(&req.status)? {
        customer.status = status;
    }
    customer.updated_at = Utc::now();

    let saved = state.customers.save(customer).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(mappers::customer_dto(&saved))))
}

/// GET /api/customers/{id}/notes
pub async fn notes(
    _identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let customer = load(&state, path.into_inner()).await?;
    let notes = state.customers.notes_for(customer.id).await?;
    let dtos: Vec<_> = notes.iter().map(mappers::note_dto).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::ok(dtos)))
}

/// POST /api/customers/{id}/notes
pub async fn add_note(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<AddNoteRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    if req.content.trim().is_empty() {
        return Err(AppError::BadRequest("Note must not be empty".to_string()));
    }

    let customer = load(&state, path.into_inner()).await?;
    let note = CustomerNote::new(customer.id, identity.user_id, req.content);
    let saved = state.customers.add_note(note).await?;

    Ok(HttpResponse::Created().json(ApiResponse::ok(mappers::note_dto(&saved))))
}

/// Aggregate counts, shared with the dashboard.
pub(crate) async fn compute_stats(state: &AppState) -> AppResult<CustomerStats> {
    Ok(CustomerStats {
        total: state.customers.count(None).await?,
        active: state.customers.count(Some(EntityStatus::Active)).await?,
        inactive: state.customers.count(Some(EntityStatus::Inactive)).await?,
    })
}

/// GET /api/customers/stats
pub async fn stats(_identity: Identity, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let stats = compute_stats(&state).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(stats)))
}
