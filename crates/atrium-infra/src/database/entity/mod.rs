//! SeaORM entities for the Atrium schema.

pub mod appointment;
pub mod contact_request;
pub mod customer;
pub mod customer_note;
pub mod password_reset_token;
pub mod project;
pub mod refresh_token;
pub mod role;
pub mod user;
