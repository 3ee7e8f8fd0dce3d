//! HTTP transport seam.
//!
//! Everything the session layer sends goes through the [`Transport`]
//! trait, so tests can drive the whole flow without a server. The
//! reqwest implementation is the production path.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use atrium_shared::ApiResponse;

use crate::error::SessionError;

/// HTTP verbs the API surface uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
    Patch,
    Delete,
}

/// A request to the API server.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub verb: Verb,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub bearer: Option<String>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(verb: Verb, path: impl Into<String>) -> Self {
        Self {
            verb,
            path: path.into(),
            query: Vec::new(),
            bearer: None,
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Verb::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Verb::Post, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Verb::Patch, path)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn with_bearer(mut self, token: Option<String>) -> Self {
        self.bearer = token;
        self
    }

    pub fn with_json(mut self, body: &impl serde::Serialize) -> Self {
        self.body = serde_json::to_value(body).ok();
        self
    }
}

/// What came back: the status code and the body, if it was JSON.
/// A non-JSON body surfaces as `None` - the status decides what that
/// means downstream.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport seam between the session layer and the network.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<RawResponse, SessionError>;
}

/// Decode a raw response into the standard envelope.
///
/// Status takes precedence over body parseability: a 2xx with an
/// undecodable body is treated as a success with no payload, while a
/// non-2xx always maps to [`SessionError::Http`].
pub fn decode<T: DeserializeOwned>(raw: RawResponse) -> Result<ApiResponse<T>, SessionError> {
    if !raw.is_success() {
        return Err(SessionError::Http {
            status: raw.status,
            message: error_message(raw.body.as_ref(), raw.status),
        });
    }

    match raw.body {
        None => {
            tracing::warn!(status = raw.status, "Success response with undecodable body");
            Ok(ApiResponse {
                success: true,
                data: None,
                message: None,
            })
        }
        Some(body) => serde_json::from_value(body).map_err(|e| SessionError::Parse(e.to_string())),
    }
}

/// Unwrap a decoded envelope, requiring a payload.
pub fn require_data<T>(envelope: ApiResponse<T>) -> Result<T, SessionError> {
    if !envelope.success {
        return Err(SessionError::Rejected(
            envelope
                .message
                .unwrap_or_else(|| "request rejected".to_string()),
        ));
    }
    envelope
        .data
        .ok_or_else(|| SessionError::Parse("expected payload was missing".to_string()))
}

/// Best human-readable message from an error body (RFC 7807 or envelope).
fn error_message(body: Option<&Value>, status: u16) -> String {
    if let Some(body) = body {
        for key in ["detail", "title", "message"] {
            if let Some(text) = body.get(key).and_then(Value::as_str) {
                return text.to_string();
            }
        }
    }
    format!("http status {status}")
}

/// Production transport over reqwest.
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: ApiRequest) -> Result<RawResponse, SessionError> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), request.path);

        let mut builder = match request.verb {
            Verb::Get => self.client.get(&url),
            Verb::Post => self.client.post(&url),
            Verb::Patch => self.client.patch(&url),
            Verb::Delete => self.client.delete(&url),
        };

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        let body = match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(_) if text.is_empty() => None,
            Err(e) => {
                tracing::debug!(status, error = %e, "Response body was not JSON");
                None
            }
        };

        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scriptable transport for driving the session layer in tests.

    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    pub struct MockTransport {
        pub calls: AtomicU32,
        pub seen: Mutex<Vec<ApiRequest>>,
        responses: Mutex<VecDeque<Result<RawResponse, SessionError>>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self {
                calls: AtomicU32::new(0),
                seen: Mutex::new(Vec::new()),
                responses: Mutex::new(VecDeque::new()),
            }
        }

        pub fn push_ok(&self, status: u16, body: serde_json::Value) {
            self.responses.lock().unwrap().push_back(Ok(RawResponse {
                status,
                body: Some(body),
            }));
        }

        pub fn push_raw(&self, response: Result<RawResponse, SessionError>) {
            self.responses.lock().unwrap().push_back(response);
        }

        pub fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn execute(&self, request: ApiRequest) -> Result<RawResponse, SessionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Ok(RawResponse {
                        status: 500,
                        body: None,
                    })
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atrium_shared::dto::TokenData;

    #[test]
    fn non_2xx_maps_to_http_error_with_detail() {
        let raw = RawResponse {
            status: 401,
            body: Some(serde_json::json!({
                "type": "about:blank",
                "title": "Unauthorized",
                "status": 401
            })),
        };

        let err = decode::<TokenData>(raw).unwrap_err();
        assert_eq!(
            err,
            SessionError::Http {
                status: 401,
                message: "Unauthorized".to_string()
            }
        );
    }

    #[test]
    fn undecodable_2xx_body_counts_as_success() {
        let raw = RawResponse {
            status: 200,
            body: None,
        };

        let envelope = decode::<TokenData>(raw).unwrap();
        assert!(envelope.success);
        assert!(envelope.data.is_none());
    }

    #[test]
    fn envelope_with_payload_decodes() {
        let raw = RawResponse {
            status: 200,
            body: Some(serde_json::json!({
                "success": true,
                "data": {
                    "access_token": "a",
                    "refresh_token": "r",
                    "expires_in": 900
                }
            })),
        };

        let data = require_data(decode::<TokenData>(raw).unwrap()).unwrap();
        assert_eq!(data.access_token, "a");
    }

    #[test]
    fn rejected_envelope_surfaces_message() {
        let envelope = ApiResponse::<TokenData> {
            success: false,
            data: None,
            message: Some("nope".to_string()),
        };

        assert_eq!(
            require_data(envelope).unwrap_err(),
            SessionError::Rejected("nope".to_string())
        );
    }
}
