//! Application configuration loaded from environment variables.

use std::env;

use atrium_infra::database::DatabaseConfig;

/// Auth-related settings.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Refresh token lifetime in days.
    pub refresh_ttl_days: i64,
    /// Password reset token lifetime in minutes.
    pub reset_ttl_minutes: i64,
    /// Mark refresh cookies `Secure` (production deployments).
    pub secure_cookies: bool,
    /// Base URL of the frontend, used in password reset links.
    pub app_base_url: String,
    /// Email address used to seed the first admin account.
    pub admin_email: Option<String>,
    /// Password for the seeded admin account.
    pub admin_password: Option<String>,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: Option<DatabaseConfig>,
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let database = env::var("DATABASE_URL").ok().map(|url| DatabaseConfig {
            url,
            max_connections: env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(50),
            min_connections: env::var("DB_MIN_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        });

        let is_production = env::var("RUST_ENV")
            .map(|v| v == "production" || v == "prod")
            .unwrap_or(false);

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            database,
            auth: AuthConfig {
                refresh_ttl_days: env::var("REFRESH_TOKEN_TTL_DAYS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
                reset_ttl_minutes: env::var("RESET_TOKEN_TTL_MINUTES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
                secure_cookies: is_production,
                app_base_url: env::var("APP_BASE_URL")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string()),
                admin_email: env::var("ADMIN_EMAIL").ok(),
                admin_password: env::var("ADMIN_PASSWORD").ok(),
            },
        }
    }
}
