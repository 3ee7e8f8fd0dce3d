//! # Atrium Client
//!
//! Typed client SDK for the Atrium API. The heart of the crate is the
//! [`SessionManager`], which keeps a login session alive across access
//! token expiry: it mirrors credentials across a primary and a backup
//! store, refreshes tokens with bounded retries, collapses duplicate
//! in-flight auth calls, and tells the embedding application about
//! login/logout transitions through a single debounced event stream.
//!
//! Navigation is never performed here: when refresh fails repeatedly the
//! session emits [`SessionEvent::RedirectRequired`] and the embedder
//! decides what to do with it.

pub mod api;
pub mod config;
pub mod credentials;
pub mod dedup;
pub mod error;
pub mod events;
pub mod notifier;
pub mod refresh;
pub mod session;
pub mod transport;

pub use config::SessionConfig;
pub use credentials::{CredentialStore, InMemoryCredentialStore, TokenPair, TokenStore};
pub use error::SessionError;
pub use events::{SessionEvent, SessionEvents};
pub use session::{LoginOutcome, SessionManager};
pub use transport::{ApiRequest, RawResponse, ReqwestTransport, Transport, Verb};
