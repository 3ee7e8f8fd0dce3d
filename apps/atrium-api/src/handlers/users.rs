//! User and role administration handlers.

use actix_web::{HttpResponse, web};
use std::time::Duration;
use uuid::Uuid;

use atrium_core::domain::User;
use atrium_shared::ApiResponse;
use atrium_shared::dto::{CreateUserRequest, UserDto};

use crate::handlers::mappers;
use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// How long a current-user lookup may be served from cache.
const ME_CACHE_TTL: Duration = Duration::from_secs(300);

async fn load_user_dto(state: &AppState, id: Uuid) -> AppResult<UserDto> {
    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {id}")))?;
    let role = state
        .roles
        .find_by_id(user.role_id)
        .await?
        .map(|role| role.name)
        .unwrap_or_else(|| "staff".to_string());
    Ok(mappers::user_dto(&user, &role))
}

/// GET /api/users/me
pub async fn me(identity: Identity, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let cache_key = format!("user:me:{}", identity.user_id);
    if let Some(cached) = state.cache.get(&cache_key).await {
        if let Ok(dto) = serde_json::from_str::<UserDto>(&cached) {
            return Ok(HttpResponse::Ok().json(ApiResponse::ok(dto)));
        }
    }

    let dto = load_user_dto(&state, identity.user_id).await?;

    if let Ok(serialized) = serde_json::to_string(&dto) {
        if let Err(e) = state
            .cache
            .set(&cache_key, &serialized, Some(ME_CACHE_TTL))
            .await
        {
            tracing::warn!("Could not cache current user: {}", e);
        }
    }

    Ok(HttpResponse::Ok().json(ApiResponse::ok(dto)))
}

/// GET /api/users - admin only
pub async fn list(
    identity: Identity,
    state: web::Data<AppState>,
    query: web::Query<std::collections::HashMap<String, String>>,
) -> AppResult<HttpResponse> {
    identity.require_admin()?;

    let active_only = query
        .get("active_only")
        .map(|v| v != "false" && v != "0")
        .unwrap_or(true);

    let users = state.users.list(active_only).await?;
    let mut dtos = Vec::with_capacity(users.len());
    for user in &users {
        let role = state
            .roles
            .find_by_id(user.role_id)
            .await?
            .map(|role| role.name)
            .unwrap_or_else(|| "staff".to_string());
        dtos.push(mappers::user_dto(user, &role));
    }

    Ok(HttpResponse::Ok().json(ApiResponse::ok(dtos)))
}

/// GET /api/users/{id}
pub async fn get(
    _identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let dto = load_user_dto(&state, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(dto)))
}

/// POST /api/users - admin only
pub async fn create(
    identity: Identity,
    state: web::Data<AppState>,
    body: web::Json<CreateUserRequest>,
) -> AppResult<HttpResponse> {
    identity.require_admin()?;
    let req = body.into_inner();

    if req.email.is_empty() || !req.email.contains('@') {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }
    if req.password.len() < 8 {
        return Err(AppError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    if state.users.find_by_email(&req.email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let role = state
        .roles
        .find_by_name(&req.role)
        .await?
        .ok_or_else(|| AppError::BadRequest(format!("Unknown role: {}", req.role)))?;

    let password_hash = state.password_service.hash(&req.password)?;
    let user = User::new(req.email, password_hash, req.display_name, role.id);
    let saved = state.users.save(user).await?;

    tracing::info!(user_id = %saved.id, "User created");

    Ok(HttpResponse::Created().json(ApiResponse::ok(mappers::user_dto(&saved, &role.name))))
}

/// GET /api/roles
pub async fn roles(_identity: Identity, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let roles = state.roles.list().await?;
    let dtos: Vec<_> = roles.iter().map(mappers::role_dto).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::ok(dtos)))
}
