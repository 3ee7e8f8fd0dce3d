//! Project tracking handlers.

use actix_web::{HttpResponse, web};
use chrono::Utc;
use uuid::Uuid;

use atrium_core::domain::{Project, ProjectStatus};
use atrium_shared::ApiResponse;
use atrium_shared::dto::{CreateProjectRequest, PageQuery, UpdateProjectRequest};

use crate::handlers::{mappers, parse_status};
use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

async fn load(state: &AppState, id: Uuid) -> AppResult<Project> {
    state
        .projects
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Project {id}")))
}

/// GET /api/projects
pub async fn list(
    _identity: Identity,
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let status = parse_status::<ProjectStatus>(&query.status)?;
    let page = state
        .projects
        .list(query.limit, query.offset, status)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(mappers::paged(
        page,
        query.limit,
        query.offset,
        mappers::project_dto,
    ))))
}

/// GET /api/projects/{id}
pub async fn get(
    _identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let project = load(&state, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(mappers::project_dto(&project))))
}

/// POST /api/projects
pub async fn create(
    _identity: Identity,
    state: web::Data<AppState>,
    body: web::Json<CreateProjectRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    if req.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name must not be empty".to_string()));
    }
    if state.customers.find_by_id(req.customer_id).await?.is_none() {
        return Err(AppError::BadRequest("Customer does not exist".to_string()));
    }

    let project = Project::new(req.customer_id, req.name, req.description);
    let saved = state.projects.save(project).await?;

    tracing::info!(project_id = %saved.id, "Project created");

    Ok(HttpResponse::Created().json(ApiResponse::ok(mappers::project_dto(&saved))))
}

/// PATCH /api/projects/{id}
pub async fn update(
    _identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateProjectRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let mut project = load(&state, path.into_inner()).await?;

    if let Some(name) = req.name {
        if name.trim().is_empty() {
            return Err(AppError::BadRequest("Name must not be empty".to_string()));
        }
        project.name = name;
    }
    if let Some(description) = req.description {
        project.description = description;
    }
    if let Some(status) = parse_status::<ProjectStatus>(&req.status)? {
        project.status = status;
    }
    project.updated_at = Utc::now();

    let saved = state.projects.save(project).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(mappers::project_dto(&saved))))
}
