//! Authentication handlers.

use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::{HttpRequest, HttpResponse, web};
use chrono::{Duration, Utc};

use atrium_core::domain::{PasswordResetToken, RefreshToken, User};
use atrium_core::ports::MailJob;
use atrium_shared::ApiResponse;
use atrium_shared::dto::{
    ChangePasswordRequest, ForgotPasswordRequest, LoginData, LoginRequest, RefreshRequest,
    ResetPasswordRequest, TokenData, ValidateData,
};

use crate::handlers::mappers;
use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::{AppError, AppResult};
use crate::security;
use crate::state::AppState;

const ACCESS_COOKIE: &str = "auth_token";
const REFRESH_COOKIE: &str = "refresh_token";

/// Resolve a user's role name for token claims and DTOs.
async fn role_name(state: &AppState, user: &User) -> AppResult<String> {
    Ok(state
        .roles
        .find_by_id(user.role_id)
        .await?
        .map(|role| role.name)
        .unwrap_or_else(|| "staff".to_string()))
}

/// Issue a fresh access token plus a rotated refresh token.
async fn issue_tokens(state: &AppState, user: &User, role: &str) -> AppResult<TokenData> {
    let access_token = state
        .token_service
        .generate_token(user.id, &user.email, role)?;

    let refresh_plain = security::generate_opaque_token();
    let record = RefreshToken::new(
        user.id,
        security::hash_token(&refresh_plain),
        Duration::days(state.auth.refresh_ttl_days),
    );
    state.refresh_tokens.save(record).await?;

    Ok(TokenData {
        access_token,
        refresh_token: refresh_plain,
        expires_in: state.token_service.expiration_seconds() as u64,
    })
}

/// Session cookies mirroring the token pair. The refresh cookie is the
/// sensitive one and gets `Secure` in production.
fn token_cookies(state: &AppState, tokens: &TokenData) -> (Cookie<'static>, Cookie<'static>) {
    let access = Cookie::build(ACCESS_COOKIE, tokens.access_token.clone())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish();
    let refresh = Cookie::build(REFRESH_COOKIE, tokens.refresh_token.clone())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.auth.secure_cookies)
        .max_age(CookieDuration::days(state.auth.refresh_ttl_days))
        .finish();
    (access, refresh)
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build(name, "").path("/").finish();
    cookie.make_removal();
    cookie
}

/// Refresh token from the request body, falling back to the cookie.
fn presented_refresh_token(body: Option<&RefreshRequest>, req: &HttpRequest) -> Option<String> {
    if let Some(body) = body {
        if !body.refresh_token.is_empty() {
            return Some(body.refresh_token.clone());
        }
    }
    req.cookie(REFRESH_COOKIE).map(|c| c.value().to_string())
}

/// POST /api/auth/login
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    if req.email.is_empty() || !req.email.contains('@') {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }
    if req.password.is_empty() {
        return Err(AppError::BadRequest("Password must not be empty".to_string()));
    }

    let user = state
        .users
        .find_by_email(&req.email)
        .await?
        .filter(User::is_active)
        .ok_or(AppError::Unauthorized)?;

    let valid = state
        .password_service
        .verify(&req.password, &user.password_hash)?;
    if !valid {
        return Err(AppError::Unauthorized);
    }

    let role = role_name(&state, &user).await?;
    let tokens = issue_tokens(&state, &user, &role).await?;
    let (access_cookie, refresh_cookie) = token_cookies(&state, &tokens);

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(HttpResponse::Ok()
        .cookie(access_cookie)
        .cookie(refresh_cookie)
        .json(ApiResponse::ok(LoginData {
            user: Some(mappers::user_dto(&user, &role)),
            tokens: Some(tokens),
        })))
}

/// POST /api/auth/refresh
pub async fn refresh(
    state: web::Data<AppState>,
    body: Option<web::Json<RefreshRequest>>,
    req: HttpRequest,
) -> AppResult<HttpResponse> {
    let presented = presented_refresh_token(body.as_deref(), &req)
        .ok_or(AppError::Unauthorized)?;

    let record = state
        .refresh_tokens
        .find_by_hash(&security::hash_token(&presented))
        .await?
        .filter(|t| t.is_active(Utc::now()))
        .ok_or(AppError::Unauthorized)?;

    let user = state
        .users
        .find_by_id(record.user_id)
        .await?
        .filter(User::is_active)
        .ok_or(AppError::Unauthorized)?;

    // Rotation: the presented token dies with this exchange.
    state.refresh_tokens.revoke(record.id).await?;

    let role = role_name(&state, &user).await?;
    let tokens = issue_tokens(&state, &user, &role).await?;
    let (access_cookie, refresh_cookie) = token_cookies(&state, &tokens);

    tracing::debug!(user_id = %user.id, "Refresh token rotated");

    Ok(HttpResponse::Ok()
        .cookie(access_cookie)
        .cookie(refresh_cookie)
        .json(ApiResponse::ok(tokens)))
}

/// POST /api/auth/logout
pub async fn logout(
    state: web::Data<AppState>,
    body: Option<web::Json<RefreshRequest>>,
    req: HttpRequest,
) -> AppResult<HttpResponse> {
    if let Some(presented) = presented_refresh_token(body.as_deref(), &req) {
        if let Ok(Some(record)) = state
            .refresh_tokens
            .find_by_hash(&security::hash_token(&presented))
            .await
        {
            if let Err(e) = state.refresh_tokens.revoke(record.id).await {
                tracing::warn!("Could not revoke refresh token on logout: {}", e);
            }
        }
    }

    Ok(HttpResponse::Ok()
        .cookie(removal_cookie(ACCESS_COOKIE))
        .cookie(removal_cookie(REFRESH_COOKIE))
        .json(ApiResponse::<()>::ok_empty("logged out")))
}

/// POST /api/auth/validate
pub async fn validate(identity: OptionalIdentity) -> AppResult<HttpResponse> {
    let data = match identity.0 {
        Some(identity) => ValidateData {
            valid: true,
            user_id: Some(identity.user_id),
        },
        None => ValidateData {
            valid: false,
            user_id: None,
        },
    };
    Ok(HttpResponse::Ok().json(ApiResponse::ok(data)))
}

/// POST /api/auth/forgot-password
///
/// Always answers the same way, so the endpoint cannot be used to probe
/// which addresses exist.
pub async fn forgot_password(
    state: web::Data<AppState>,
    body: web::Json<ForgotPasswordRequest>,
) -> AppResult<HttpResponse> {
    let email = body.email.trim().to_lowercase();

    if let Some(user) = state.users.find_by_email(&email).await?.filter(User::is_active) {
        let reset_plain = security::generate_opaque_token();
        let record = PasswordResetToken::new(
            user.id,
            security::hash_token(&reset_plain),
            Duration::minutes(state.auth.reset_ttl_minutes),
        );
        state.reset_tokens.save(record).await?;

        let link = format!(
            "{}/auth/reset-password#token={}",
            state.auth.app_base_url.trim_end_matches('/'),
            reset_plain
        );
        let mail = MailJob::new(
            user.email.clone(),
            "Reset your Atrium password",
            format!(
                "Hello {},\n\nUse the link below to choose a new password. \
                 It expires in {} minutes.\n\n{}\n",
                user.display_name, state.auth.reset_ttl_minutes, link
            ),
        );
        state.mail.enqueue(mail).await?;
        tracing::info!(user_id = %user.id, "Password reset mail queued");
    }

    Ok(HttpResponse::Ok().json(ApiResponse::<()>::ok_empty(
        "If the address exists, a reset link is on its way",
    )))
}

/// POST /api/auth/reset-password
pub async fn reset_password(
    state: web::Data<AppState>,
    body: web::Json<ResetPasswordRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    validate_password(&req.new_password)?;

    let record = state
        .reset_tokens
        .find_by_hash(&security::hash_token(&req.token))
        .await?
        .filter(|t| t.is_usable(Utc::now()))
        .ok_or_else(|| AppError::BadRequest("Invalid or expired reset token".to_string()))?;

    let mut user = state
        .users
        .find_by_id(record.user_id)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid or expired reset token".to_string()))?;

    user.password_hash = state.password_service.hash(&req.new_password)?;
    user.updated_at = Utc::now();
    state.users.save(user.clone()).await?;
    state.reset_tokens.mark_used(record.id).await?;

    // A reset invalidates every open session.
    state.refresh_tokens.revoke_all_for_user(user.id).await?;

    tracing::info!(user_id = %user.id, "Password reset completed");

    Ok(HttpResponse::Ok().json(ApiResponse::<()>::ok_empty("password updated")))
}

/// POST /api/auth/change-password
pub async fn change_password(
    identity: Identity,
    state: web::Data<AppState>,
    body: web::Json<ChangePasswordRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    validate_password(&req.new_password)?;

    let mut user = state
        .users
        .find_by_id(identity.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let valid = state
        .password_service
        .verify(&req.current_password, &user.password_hash)?;
    if !valid {
        return Err(AppError::Unauthorized);
    }

    user.password_hash = state.password_service.hash(&req.new_password)?;
    user.updated_at = Utc::now();
    state.users.save(user.clone()).await?;

    // Other sessions must re-authenticate with the new password.
    state.refresh_tokens.revoke_all_for_user(user.id).await?;

    tracing::info!(user_id = %user.id, "Password changed");

    Ok(HttpResponse::Ok().json(ApiResponse::<()>::ok_empty("password changed")))
}

fn validate_password(password: &str) -> AppResult<()> {
    if password.len() < 8 {
        return Err(AppError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}
