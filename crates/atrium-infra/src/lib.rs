//! # Atrium Infrastructure
//!
//! Concrete implementations of the ports defined in `atrium-core`.
//! This crate contains database, cache, mail, and auth integrations.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external dependencies, in-memory only
//! - `postgres` - PostgreSQL database support via SeaORM
//! - `auth` - JWT + Argon2 authentication
//! - `rate-limit` - Rate limiting via governor

pub mod cache;
pub mod database;
pub mod mail;
pub mod memory;

#[cfg(feature = "auth")]
pub mod auth;

#[cfg(feature = "rate-limit")]
pub mod rate_limit;

// Re-exports - In-Memory
pub use cache::InMemoryCache;
pub use database::DatabaseConnections;
pub use mail::InMemoryMailQueue;
pub use memory::{
    InMemoryAppointmentRepository, InMemoryContactRequestRepository, InMemoryCustomerRepository,
    InMemoryPasswordResetTokenRepository, InMemoryProjectRepository,
    InMemoryRefreshTokenRepository, InMemoryRoleRepository, InMemoryUserRepository,
};

#[cfg(feature = "auth")]
pub use auth::{Argon2PasswordService, JwtConfig, JwtTokenService};

#[cfg(feature = "rate-limit")]
pub use rate_limit::{InMemoryRateLimiter, RateLimitConfig};
