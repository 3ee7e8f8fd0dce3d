//! HTTP handlers and route configuration.

mod appointments;
mod auth;
mod customers;
mod dashboard;
mod health;
pub(crate) mod mappers;
mod projects;
mod requests;
mod users;

use std::str::FromStr;

use actix_web::web;

use crate::middleware::error::AppError;
use crate::middleware::rate_limit::RateLimitMiddleware;
use crate::state::AppState;

/// Parse an optional status query parameter into its domain enum.
pub(crate) fn parse_status<T: FromStr>(status: &Option<String>) -> Result<Option<T>, AppError> {
    match status {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("Unknown status: {raw}"))),
    }
}

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig, state: &AppState) {
    let login_limiter = RateLimitMiddleware::new(state.login_limiter.clone());

    cfg.service(
        web::scope("/api")
            // Public routes
            .route("/health", web::get().to(health::health_check))
            // Auth routes
            .service(
                web::scope("/auth")
                    .service(
                        web::resource("/login")
                            .wrap(login_limiter)
                            .route(web::post().to(auth::login)),
                    )
                    .route("/logout", web::post().to(auth::logout))
                    .route("/refresh", web::post().to(auth::refresh))
                    .route("/forgot-password", web::post().to(auth::forgot_password))
                    .route("/reset-password", web::post().to(auth::reset_password))
                    .route("/change-password", web::post().to(auth::change_password))
                    .route("/validate", web::post().to(auth::validate)),
            )
            // User administration
            .service(
                web::scope("/users")
                    .route("/me", web::get().to(users::me))
                    .route("", web::get().to(users::list))
                    .route("", web::post().to(users::create))
                    .route("/{id}", web::get().to(users::get)),
            )
            .route("/roles", web::get().to(users::roles))
            // CRM
            .service(
                web::scope("/customers")
                    .route("/stats", web::get().to(customers::stats))
                    .route("", web::get().to(customers::list))
                    .route("", web::post().to(customers::create))
                    .route("/{id}", web::get().to(customers::get))
                    .route("/{id}", web::patch().to(customers::update))
                    .route("/{id}/notes", web::get().to(customers::notes))
                    .route("/{id}/notes", web::post().to(customers::add_note)),
            )
            .service(
                web::scope("/requests")
                    .route("/stats", web::get().to(requests::stats))
                    .route("", web::get().to(requests::list))
                    .route("", web::post().to(requests::create))
                    .route("/{id}", web::get().to(requests::get))
                    .route("/{id}", web::patch().to(requests::update))
                    .route("/{id}/assign", web::post().to(requests::assign))
                    .route("/{id}/convert", web::post().to(requests::convert)),
            )
            .service(
                web::scope("/appointments")
                    .route("/stats", web::get().to(appointments::stats))
                    .route("", web::get().to(appointments::list))
                    .route("", web::post().to(appointments::create))
                    .route("/{id}", web::get().to(appointments::get))
                    .route("/{id}", web::patch().to(appointments::update))
                    .route("/{id}/cancel", web::post().to(appointments::cancel)),
            )
            .service(
                web::scope("/projects")
                    .route("", web::get().to(projects::list))
                    .route("", web::post().to(projects::create))
                    .route("/{id}", web::get().to(projects::get))
                    .route("/{id}", web::patch().to(projects::update)),
            )
            .route("/dashboard/stats", web::get().to(dashboard::stats)),
    );
}
