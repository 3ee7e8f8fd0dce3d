use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::domain::{
    Appointment, AppointmentStatus, ContactRequest, Customer, CustomerNote, EntityStatus,
    PasswordResetToken, Project, ProjectStatus, RefreshToken, RequestStatus, Role, User,
};
use crate::error::RepoError;

/// One page of a filtered listing, with the unfiltered-total for the
/// same filter so handlers can paginate.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Save an entity (create or update).
    async fn save(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// User repository with domain-specific methods.
#[async_trait]
pub trait UserRepository: BaseRepository<User, Uuid> {
    /// Find a user by their email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    /// List users, optionally restricted to active ones.
    async fn list(&self, active_only: bool) -> Result<Vec<User>, RepoError>;
}

/// Role repository.
#[async_trait]
pub trait RoleRepository: BaseRepository<Role, Uuid> {
    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, RepoError>;

    async fn list(&self) -> Result<Vec<Role>, RepoError>;
}

/// Customer repository - CRM contacts plus their notes.
#[async_trait]
pub trait CustomerRepository: BaseRepository<Customer, Uuid> {
    /// Find a customer by email, for matching inbound contact requests.
    async fn find_by_email(&self, email: &str) -> Result<Option<Customer>, RepoError>;

    async fn list(
        &self,
        limit: u64,
        offset: u64,
        status: Option<EntityStatus>,
    ) -> Result<Page<Customer>, RepoError>;

    async fn count(&self, status: Option<EntityStatus>) -> Result<u64, RepoError>;

    async fn add_note(&self, note: CustomerNote) -> Result<CustomerNote, RepoError>;

    async fn notes_for(&self, customer_id: Uuid) -> Result<Vec<CustomerNote>, RepoError>;
}

/// Appointment repository.
#[async_trait]
pub trait AppointmentRepository: BaseRepository<Appointment, Uuid> {
    async fn list(
        &self,
        limit: u64,
        offset: u64,
        status: Option<AppointmentStatus>,
        upcoming_only: bool,
    ) -> Result<Page<Appointment>, RepoError>;

    async fn count(&self, status: Option<AppointmentStatus>) -> Result<u64, RepoError>;

    /// Scheduled appointments starting within `window` of `now`,
    /// for reminder dispatch.
    async fn upcoming_within(
        &self,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<Vec<Appointment>, RepoError>;
}

/// Project repository.
#[async_trait]
pub trait ProjectRepository: BaseRepository<Project, Uuid> {
    async fn list(
        &self,
        limit: u64,
        offset: u64,
        status: Option<ProjectStatus>,
    ) -> Result<Page<Project>, RepoError>;
}

/// Contact request repository.
#[async_trait]
pub trait ContactRequestRepository: BaseRepository<ContactRequest, Uuid> {
    async fn list(
        &self,
        limit: u64,
        offset: u64,
        status: Option<RequestStatus>,
        assigned: Option<bool>,
        assigned_to: Option<Uuid>,
    ) -> Result<Page<ContactRequest>, RepoError>;

    async fn count(&self, status: Option<RequestStatus>) -> Result<u64, RepoError>;

    async fn count_unassigned(&self) -> Result<u64, RepoError>;
}

/// Refresh token repository - lookups are by token hash, never plaintext.
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    async fn save(&self, token: RefreshToken) -> Result<RefreshToken, RepoError>;

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>, RepoError>;

    async fn revoke(&self, id: Uuid) -> Result<(), RepoError>;

    /// Revoke every active token for a user (logout-everywhere,
    /// password change).
    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, RepoError>;

    /// Delete tokens past their expiry. Returns the number removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepoError>;
}

/// Password reset token repository.
#[async_trait]
pub trait PasswordResetTokenRepository: Send + Sync {
    async fn save(&self, token: PasswordResetToken) -> Result<PasswordResetToken, RepoError>;

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<PasswordResetToken>, RepoError>;

    async fn mark_used(&self, id: Uuid) -> Result<(), RepoError>;

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepoError>;
}
