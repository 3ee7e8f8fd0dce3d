//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod cache;
mod mail;
mod rate_limit;
mod repository;

pub use auth::{AuthError, PasswordService, TokenClaims, TokenService};
pub use cache::{Cache, CacheError};
pub use mail::{MailJob, MailOutcome, MailQueue, MailQueueError, MailSender, MailStats};
pub use rate_limit::{RateLimitError, RateLimitResult, RateLimiter};
pub use repository::{
    AppointmentRepository, BaseRepository, ContactRequestRepository, CustomerRepository, Page,
    PasswordResetTokenRepository, ProjectRepository, RefreshTokenRepository, RoleRepository,
    UserRepository,
};
