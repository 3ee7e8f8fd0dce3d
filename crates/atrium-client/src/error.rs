//! Session error taxonomy.
//!
//! Errors are cloneable so a single failed in-flight request can be
//! handed to every caller that joined it.

use thiserror::Error;

/// Errors produced by the session layer and the API operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// No refresh credential in either store; refresh short-circuits
    /// without a network call.
    #[error("no refresh token available")]
    NoRefreshToken,

    /// Non-2xx response from the server.
    #[error("http {status}: {message}")]
    Http { status: u16, message: String },

    /// The server accepted the request but the envelope said no.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// A 2xx body that could not be mapped onto the expected payload.
    /// Undecodable bodies on 2xx are treated as success upstream; this
    /// fires only when a payload was required but absent.
    #[error("response could not be decoded: {0}")]
    Parse(String),

    /// Local throttle: the previous identical call was too recent.
    #[error("request throttled locally")]
    Throttled,

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// Credential storage failed in a way that could not be papered over.
    #[error("credential storage error: {0}")]
    Credential(String),
}

impl SessionError {
    /// Status code if this is an HTTP error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
