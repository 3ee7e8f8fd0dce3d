//! In-memory repository implementations.
//!
//! The fallback when `DATABASE_URL` is not configured, and the substrate
//! for handler-level tests. Data is lost on process restart.

mod appointments;
mod customers;
mod projects;
mod requests;
mod roles;
mod tokens;
mod users;

pub use appointments::InMemoryAppointmentRepository;
pub use customers::InMemoryCustomerRepository;
pub use projects::InMemoryProjectRepository;
pub use requests::InMemoryContactRequestRepository;
pub use roles::InMemoryRoleRepository;
pub use tokens::{InMemoryPasswordResetTokenRepository, InMemoryRefreshTokenRepository};
pub use users::InMemoryUserRepository;
