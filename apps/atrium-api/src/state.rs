//! Application state - shared across all handlers.

use std::sync::Arc;

use atrium_core::domain::{Role, User};
use atrium_core::ports::{
    AppointmentRepository, Cache, ContactRequestRepository, CustomerRepository, MailOutcome,
    MailQueue, PasswordResetTokenRepository, PasswordService, ProjectRepository, RateLimiter,
    RefreshTokenRepository, RoleRepository, TokenService, UserRepository,
};
use atrium_infra::cache::InMemoryCache;
use atrium_infra::mail::InMemoryMailQueue;
use atrium_infra::memory::{
    InMemoryAppointmentRepository, InMemoryContactRequestRepository, InMemoryCustomerRepository,
    InMemoryPasswordResetTokenRepository, InMemoryProjectRepository,
    InMemoryRefreshTokenRepository, InMemoryRoleRepository, InMemoryUserRepository,
};

#[cfg(feature = "postgres")]
use atrium_infra::database::{
    DatabaseConnections, PostgresAppointmentRepository, PostgresContactRequestRepository,
    PostgresCustomerRepository, PostgresPasswordResetTokenRepository, PostgresProjectRepository,
    PostgresRefreshTokenRepository, PostgresRoleRepository, PostgresUserRepository,
};

use crate::config::{AppConfig, AuthConfig};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub roles: Arc<dyn RoleRepository>,
    pub customers: Arc<dyn CustomerRepository>,
    pub appointments: Arc<dyn AppointmentRepository>,
    pub projects: Arc<dyn ProjectRepository>,
    pub requests: Arc<dyn ContactRequestRepository>,
    pub refresh_tokens: Arc<dyn RefreshTokenRepository>,
    pub reset_tokens: Arc<dyn PasswordResetTokenRepository>,
    pub cache: Arc<dyn Cache>,
    pub mail: Arc<dyn MailQueue>,
    pub token_service: Arc<dyn TokenService>,
    pub password_service: Arc<dyn PasswordService>,
    pub login_limiter: Arc<dyn RateLimiter>,
    pub auth: AuthConfig,
}

struct Repositories {
    users: Arc<dyn UserRepository>,
    roles: Arc<dyn RoleRepository>,
    customers: Arc<dyn CustomerRepository>,
    appointments: Arc<dyn AppointmentRepository>,
    projects: Arc<dyn ProjectRepository>,
    requests: Arc<dyn ContactRequestRepository>,
    refresh_tokens: Arc<dyn RefreshTokenRepository>,
    reset_tokens: Arc<dyn PasswordResetTokenRepository>,
}

fn memory_repositories() -> Repositories {
    Repositories {
        users: Arc::new(InMemoryUserRepository::new()),
        roles: Arc::new(InMemoryRoleRepository::new()),
        customers: Arc::new(InMemoryCustomerRepository::new()),
        appointments: Arc::new(InMemoryAppointmentRepository::new()),
        projects: Arc::new(InMemoryProjectRepository::new()),
        requests: Arc::new(InMemoryContactRequestRepository::new()),
        refresh_tokens: Arc::new(InMemoryRefreshTokenRepository::new()),
        reset_tokens: Arc::new(InMemoryPasswordResetTokenRepository::new()),
    }
}

#[cfg(feature = "postgres")]
fn postgres_repositories(db: &DatabaseConnections) -> Repositories {
    Repositories {
        users: Arc::new(PostgresUserRepository::new(db.main.clone())),
        roles: Arc::new(PostgresRoleRepository::new(db.main.clone())),
        customers: Arc::new(PostgresCustomerRepository::new(db.main.clone())),
        appointments: Arc::new(PostgresAppointmentRepository::new(db.main.clone())),
        projects: Arc::new(PostgresProjectRepository::new(db.main.clone())),
        requests: Arc::new(PostgresContactRequestRepository::new(db.main.clone())),
        refresh_tokens: Arc::new(PostgresRefreshTokenRepository::new(db.main.clone())),
        reset_tokens: Arc::new(PostgresPasswordResetTokenRepository::new(db.main.clone())),
    }
}

#[cfg(feature = "auth")]
fn auth_services() -> (Arc<dyn TokenService>, Arc<dyn PasswordService>) {
    (
        Arc::new(atrium_infra::auth::JwtTokenService::from_env()),
        Arc::new(atrium_infra::auth::Argon2PasswordService::new()),
    )
}

#[cfg(not(feature = "auth"))]
fn auth_services() -> (Arc<dyn TokenService>, Arc<dyn PasswordService>) {
    tracing::warn!("Built without the auth feature - every login will be rejected");
    (Arc::new(DisabledAuth), Arc::new(DisabledAuth))
}

/// Stand-in used when the `auth` feature is compiled out.
#[cfg(not(feature = "auth"))]
struct DisabledAuth;

#[cfg(not(feature = "auth"))]
impl TokenService for DisabledAuth {
    fn generate_token(
        &self,
        _user_id: uuid::Uuid,
        _email: &str,
        _role: &str,
    ) -> Result<String, atrium_core::ports::AuthError> {
        Err(atrium_core::ports::AuthError::InvalidToken(
            "authentication disabled".to_string(),
        ))
    }

    fn validate_token(
        &self,
        _token: &str,
    ) -> Result<atrium_core::ports::TokenClaims, atrium_core::ports::AuthError> {
        Err(atrium_core::ports::AuthError::InvalidToken(
            "authentication disabled".to_string(),
        ))
    }

    fn expiration_seconds(&self) -> i64 {
        0
    }
}

#[cfg(not(feature = "auth"))]
impl PasswordService for DisabledAuth {
    fn hash(&self, _password: &str) -> Result<String, atrium_core::ports::AuthError> {
        Err(atrium_core::ports::AuthError::HashingError(
            "authentication disabled".to_string(),
        ))
    }

    fn verify(&self, _password: &str, _hash: &str) -> Result<bool, atrium_core::ports::AuthError> {
        Ok(false)
    }
}

#[cfg(feature = "rate-limit")]
fn login_limiter() -> Arc<dyn RateLimiter> {
    Arc::new(atrium_infra::rate_limit::InMemoryRateLimiter::from_env())
}

#[cfg(not(feature = "rate-limit"))]
fn login_limiter() -> Arc<dyn RateLimiter> {
    struct AllowAll;

    #[async_trait::async_trait]
    impl RateLimiter for AllowAll {
        async fn check(
            &self,
            _key: &str,
        ) -> Result<atrium_core::ports::RateLimitResult, atrium_core::ports::RateLimitError>
        {
            Ok(atrium_core::ports::RateLimitResult {
                allowed: true,
                remaining: u32::MAX,
                reset_after: std::time::Duration::ZERO,
            })
        }
    }

    Arc::new(AllowAll)
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Self {
        let cache: Arc<dyn Cache> = Arc::new(InMemoryCache::new());

        #[cfg(feature = "postgres")]
        let repos = {
            if let Some(db_config) = &config.database {
                match DatabaseConnections::init(db_config).await {
                    Ok(connections) => postgres_repositories(&connections),
                    Err(e) => {
                        tracing::error!(
                            "Failed to connect to database: {}. Using in-memory fallback.",
                            e
                        );
                        memory_repositories()
                    }
                }
            } else {
                tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
                memory_repositories()
            }
        };

        #[cfg(not(feature = "postgres"))]
        let repos = {
            tracing::info!("Running without postgres feature - using in-memory repositories");
            memory_repositories()
        };

        let (token_service, password_service) = auth_services();

        let mail: Arc<dyn MailQueue> = Arc::new(InMemoryMailQueue::from_env());
        // Development sender: deliveries land in the log. Swap in a real
        // SMTP sender by replacing this worker.
        if let Err(e) = mail
            .start_worker(Box::new(|job| {
                Box::pin(async move {
                    tracing::info!(to = %job.to, subject = %job.subject, "Mail dispatched");
                    MailOutcome::Sent
                })
            }))
            .await
        {
            tracing::error!("Failed to start mail worker: {}", e);
        }

        tracing::info!("Application state initialized");

        Self {
            users: repos.users,
            roles: repos.roles,
            customers: repos.customers,
            appointments: repos.appointments,
            projects: repos.projects,
            requests: repos.requests,
            refresh_tokens: repos.refresh_tokens,
            reset_tokens: repos.reset_tokens,
            cache,
            mail,
            token_service,
            password_service,
            login_limiter: login_limiter(),
            auth: config.auth.clone(),
        }
    }

    /// Seed the standard roles and, when configured, the first admin
    /// account. Safe to run on every startup.
    pub async fn seed_defaults(&self, config: &AppConfig) {
        let admin_role = match self.ensure_role("admin", vec!["*".to_string()]).await {
            Some(role) => role,
            None => return,
        };
        self.ensure_role(
            "staff",
            vec![
                "customers:read".to_string(),
                "customers:write".to_string(),
                "appointments:read".to_string(),
                "appointments:write".to_string(),
                "requests:read".to_string(),
                "requests:write".to_string(),
                "projects:read".to_string(),
                "projects:write".to_string(),
            ],
        )
        .await;

        let (Some(email), Some(password)) =
            (&config.auth.admin_email, &config.auth.admin_password)
        else {
            return;
        };

        match self.users.find_by_email(email).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                let hash = match self.password_service.hash(password) {
                    Ok(hash) => hash,
                    Err(e) => {
                        tracing::error!("Could not hash admin password: {}", e);
                        return;
                    }
                };
                let admin = User::new(email.clone(), hash, "Administrator".to_string(), admin_role.id);
                match self.users.save(admin).await {
                    Ok(_) => tracing::info!("Seeded admin account"),
                    Err(e) => tracing::error!("Could not seed admin account: {}", e),
                }
            }
            Err(e) => tracing::error!("Admin lookup failed during seeding: {}", e),
        }
    }

    async fn ensure_role(&self, name: &str, permissions: Vec<String>) -> Option<Role> {
        match self.roles.find_by_name(name).await {
            Ok(Some(role)) => Some(role),
            Ok(None) => match self.roles.save(Role::new(name.to_string(), permissions)).await {
                Ok(role) => {
                    tracing::info!(role = name, "Seeded role");
                    Some(role)
                }
                Err(e) => {
                    tracing::error!(role = name, "Could not seed role: {}", e);
                    None
                }
            },
            Err(e) => {
                tracing::error!(role = name, "Role lookup failed: {}", e);
                None
            }
        }
    }
}
