//! The session manager: one object owning the whole auth flow.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::time::Instant;

use atrium_shared::dto::{
    ChangePasswordRequest, ForgotPasswordRequest, LoginData, LoginRequest, RefreshRequest,
    ResetPasswordRequest, UserDto, ValidateData,
};

use crate::config::SessionConfig;
use crate::credentials::{TokenPair, TokenStore};
use crate::dedup::Deduplicator;
use crate::error::SessionError;
use crate::events::SessionEvents;
use crate::notifier::{AuthChangeNotifier, NotifierConfig};
use crate::refresh::RefreshController;
use crate::transport::{ApiRequest, ReqwestTransport, Transport, decode, require_data};

/// Result of a login call.
///
/// The server may answer with or without an embedded user record; when
/// it is absent the session is established but the caller must follow
/// up with [`SessionManager::current_user`].
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: Option<UserDto>,
    pub requires_user_fetch: bool,
}

impl LoginOutcome {
    pub fn has_user_data(&self) -> bool {
        self.user.is_some()
    }
}

/// Owns credentials, refresh, deduplication, and change notification
/// for one API session.
#[derive(Clone)]
pub struct SessionManager {
    pub(crate) inner: Arc<SessionInner>,
}

pub(crate) struct SessionInner {
    pub(crate) config: SessionConfig,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) tokens: TokenStore,
    pub(crate) events: SessionEvents,
    notifier: AuthChangeNotifier,
    refresh: RefreshController,
    login_flights: Deduplicator<Result<LoginOutcome, SessionError>>,
    user_flights: Deduplicator<Result<UserDto, SessionError>>,
    logout_flights: Deduplicator<Result<(), SessionError>>,
    last_user_fetch: Mutex<Option<Instant>>,
    last_auth_change: Mutex<Option<(bool, Instant)>>,
    active_path: Arc<Mutex<String>>,
}

impl SessionManager {
    /// Production constructor: reqwest transport, in-memory stores.
    pub fn new(config: SessionConfig) -> Self {
        let transport = Arc::new(ReqwestTransport::new(config.base_url.clone()));
        Self::with_parts(config, transport, TokenStore::in_memory())
    }

    /// Assemble from explicit parts; the constructor tests and embedders
    /// with custom credential stores use.
    pub fn with_parts(
        config: SessionConfig,
        transport: Arc<dyn Transport>,
        tokens: TokenStore,
    ) -> Self {
        let events = SessionEvents::default();
        let notifier = AuthChangeNotifier::new(
            NotifierConfig {
                debounce: config.notify_debounce,
                min_interval: config.notify_min_interval,
                cooldown: config.notify_cooldown,
                dispatch_retry: config.dispatch_retry,
            },
            events.clone(),
        );
        let active_path = Arc::new(Mutex::new("/".to_string()));
        let refresh = RefreshController::new(
            config.clone(),
            transport.clone(),
            tokens.clone(),
            notifier.clone(),
            events.clone(),
            active_path.clone(),
        );

        Self {
            inner: Arc::new(SessionInner {
                login_flights: Deduplicator::new(config.dedup_grace),
                user_flights: Deduplicator::new(config.dedup_grace),
                logout_flights: Deduplicator::new(config.dedup_grace),
                config,
                transport,
                tokens,
                events,
                notifier,
                refresh,
                last_user_fetch: Mutex::new(None),
                last_auth_change: Mutex::new(None),
                active_path,
            }),
        }
    }

    /// Event bus carrying auth changes and redirect signals.
    pub fn events(&self) -> SessionEvents {
        self.inner.events.clone()
    }

    /// Credential stores backing this session.
    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    /// Record where the user currently is; used as the returnUrl when a
    /// lost session forces a redirect signal.
    pub fn set_active_path(&self, path: impl Into<String>) {
        *self.inner.active_path.lock().expect("active path poisoned") = path.into();
    }

    /// Authenticate with email and password.
    ///
    /// Same-instant duplicate calls collapse onto one request; separate
    /// attempts never do, because the flight key embeds the call time.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, SessionError> {
        self.inner.tokens.synchronize().await;

        let key = format!("login-{}-{}", email, Utc::now().timestamp_millis());
        let inner = Arc::clone(&self.inner);
        let email = email.to_string();
        let password = password.to_string();

        self.inner
            .login_flights
            .run(&key, move || async move {
                SessionInner::do_login(inner, email, password).await
            })
            .await
    }

    /// End the session. Local credentials are cleared and listeners are
    /// told even when the server round trip fails.
    pub async fn logout(&self) -> Result<(), SessionError> {
        let access = self.inner.tokens.access_token().await;
        let refresh = self.inner.tokens.refresh_token().await;
        let inner = Arc::clone(&self.inner);

        let result = self
            .inner
            .logout_flights
            .run("logout", move || async move {
                let mut request = ApiRequest::post("/api/auth/logout").with_bearer(access);
                if let Some(refresh_token) = refresh {
                    request = request.with_json(&RefreshRequest { refresh_token });
                }
                let raw = inner.transport.execute(request).await?;
                decode::<serde_json::Value>(raw)?;
                Ok(())
            })
            .await;

        self.inner.tokens.clear().await;
        self.inner.record_auth_change(false);
        self.inner.notifier.notify(false);
        result
    }

    /// Exchange the refresh credential for a fresh token pair.
    pub async fn refresh(&self) -> Result<TokenPair, SessionError> {
        let result = self.inner.refresh.refresh().await;
        if result.is_ok() {
            self.inner.record_auth_change(true);
        }
        result
    }

    /// Fetch the authenticated user.
    ///
    /// Calls closer together than the configured minimum interval fail
    /// locally with [`SessionError::Throttled`]; concurrent callers
    /// share one request.
    pub async fn current_user(&self) -> Result<UserDto, SessionError> {
        {
            let mut last = self
                .inner
                .last_user_fetch
                .lock()
                .expect("user fetch stamp poisoned");
            let now = Instant::now();
            if last
                .is_some_and(|t| now.duration_since(t) < self.inner.config.user_fetch_min_interval)
            {
                return Err(SessionError::Throttled);
            }
            *last = Some(now);
        }

        self.inner.tokens.synchronize().await;
        let inner = Arc::clone(&self.inner);

        self.inner
            .user_flights
            .run("getCurrentUser", move || async move {
                let access = inner.tokens.access_token().await;
                let raw = inner
                    .transport
                    .execute(ApiRequest::get("/api/users/me").with_bearer(access))
                    .await?;
                require_data(decode::<UserDto>(raw)?)
            })
            .await
    }

    /// Check whether the current access token is still good.
    ///
    /// Inside the short window after a notified auth change this
    /// answers from local state without a network call.
    pub async fn validate(&self) -> Result<ValidateData, SessionError> {
        let recent = *self
            .inner
            .last_auth_change
            .lock()
            .expect("auth change stamp poisoned");
        if let Some((state, at)) = recent {
            if Instant::now().duration_since(at) < self.inner.config.validate_cooldown {
                tracing::debug!("Validate inside auth-change cooldown, answering locally");
                return Ok(ValidateData {
                    valid: state,
                    user_id: None,
                });
            }
        }

        self.inner.tokens.synchronize().await;
        let access = self.inner.tokens.access_token().await;
        let raw = self
            .inner
            .transport
            .execute(ApiRequest::post("/api/auth/validate").with_bearer(access))
            .await?;
        require_data(decode::<ValidateData>(raw)?)
    }

    /// Request a password reset mail.
    pub async fn forgot_password(&self, email: &str) -> Result<(), SessionError> {
        let raw = self
            .inner
            .transport
            .execute(
                ApiRequest::post("/api/auth/forgot-password").with_json(&ForgotPasswordRequest {
                    email: email.to_string(),
                }),
            )
            .await?;
        decode::<serde_json::Value>(raw)?;
        Ok(())
    }

    /// Redeem a reset token for a new password.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), SessionError> {
        let raw = self
            .inner
            .transport
            .execute(
                ApiRequest::post("/api/auth/reset-password").with_json(&ResetPasswordRequest {
                    token: token.to_string(),
                    new_password: new_password.to_string(),
                }),
            )
            .await?;
        decode::<serde_json::Value>(raw)?;
        Ok(())
    }

    /// Change the password of the authenticated user.
    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), SessionError> {
        let access = self.inner.tokens.access_token().await;
        let raw = self
            .inner
            .transport
            .execute(
                ApiRequest::post("/api/auth/change-password")
                    .with_bearer(access)
                    .with_json(&ChangePasswordRequest {
                        current_password: current_password.to_string(),
                        new_password: new_password.to_string(),
                    }),
            )
            .await?;
        decode::<serde_json::Value>(raw)?;
        Ok(())
    }
}

impl SessionInner {
    pub(crate) fn record_auth_change(&self, is_authenticated: bool) {
        *self
            .last_auth_change
            .lock()
            .expect("auth change stamp poisoned") = Some((is_authenticated, Instant::now()));
    }

    async fn do_login(
        inner: Arc<SessionInner>,
        email: String,
        password: String,
    ) -> Result<LoginOutcome, SessionError> {
        let request =
            ApiRequest::post("/api/auth/login").with_json(&LoginRequest { email, password });
        let raw = inner.transport.execute(request).await?;

        let envelope = decode::<LoginData>(raw).map_err(|e| match e {
            // The one status worth translating for the login form.
            SessionError::Http { status: 401, .. } => SessionError::Http {
                status: 401,
                message: "invalid email or password".to_string(),
            },
            other => other,
        })?;

        if !envelope.success {
            return Err(SessionError::Rejected(
                envelope
                    .message
                    .unwrap_or_else(|| "login rejected".to_string()),
            ));
        }

        let data = envelope.data.unwrap_or_default();
        if let Some(tokens) = &data.tokens {
            inner
                .tokens
                .store(&TokenPair::new(
                    tokens.access_token.clone(),
                    tokens.refresh_token.clone(),
                ))
                .await;
        }

        inner.record_auth_change(true);
        inner.notifier.notify(true);

        let requires_user_fetch = data.user.is_none();
        if requires_user_fetch {
            tracing::debug!("Login reply carried no user record, follow-up fetch required");
        }

        Ok(LoginOutcome {
            user: data.user,
            requires_user_fetch,
        })
    }

    /// Attach the current access token and run a request through the
    /// envelope decoder. The shared helper for the typed API surface.
    pub(crate) async fn send<T: serde::de::DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<T, SessionError> {
        let access = self.tokens.access_token().await;
        let raw = self.transport.execute(request.with_bearer(access)).await?;
        require_data(decode::<T>(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::events::SessionEvent;
    use crate::transport::testing::MockTransport;

    fn session() -> (SessionManager, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new());
        let manager = SessionManager::with_parts(
            SessionConfig::default(),
            transport.clone(),
            TokenStore::in_memory(),
        );
        (manager, transport)
    }

    fn user_json() -> serde_json::Value {
        serde_json::json!({
            "id": uuid::Uuid::new_v4(),
            "email": "jo@example.com",
            "display_name": "Jo",
            "role": "staff",
            "status": "active",
            "created_at": "2026-01-05T10:00:00Z"
        })
    }

    #[tokio::test(start_paused = true)]
    async fn login_with_embedded_user() {
        let (session, transport) = session();
        transport.push_ok(
            200,
            serde_json::json!({
                "success": true,
                "data": {
                    "user": user_json(),
                    "tokens": {
                        "access_token": "a",
                        "refresh_token": "r",
                        "expires_in": 900
                    }
                }
            }),
        );

        let outcome = session.login("jo@example.com", "pw").await.unwrap();

        assert!(outcome.has_user_data());
        assert!(!outcome.requires_user_fetch);
        assert_eq!(outcome.user.unwrap().email, "jo@example.com");
        assert_eq!(session.tokens().access_token().await.as_deref(), Some("a"));
    }

    #[tokio::test(start_paused = true)]
    async fn login_without_user_requires_follow_up_fetch() {
        let (session, transport) = session();
        transport.push_ok(200, serde_json::json!({ "success": true, "data": {} }));

        let outcome = session.login("jo@example.com", "pw").await.unwrap();

        assert!(!outcome.has_user_data());
        assert!(outcome.requires_user_fetch);
    }

    #[tokio::test(start_paused = true)]
    async fn login_401_gets_a_friendly_message() {
        let (session, transport) = session();
        transport.push_raw(Ok(crate::transport::RawResponse {
            status: 401,
            body: None,
        }));

        let err = session.login("jo@example.com", "wrong").await.unwrap_err();

        assert_eq!(
            err,
            SessionError::Http {
                status: 401,
                message: "invalid email or password".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn logout_clears_credentials_even_when_server_fails() {
        let (session, transport) = session();
        session.tokens().store(&TokenPair::new("a", "r")).await;
        transport.push_raw(Err(SessionError::Transport("connection reset".into())));
        let mut rx = session.events().subscribe();

        let result = session.logout().await;

        assert!(result.is_err());
        assert!(session.tokens().access_token().await.is_none());
        assert!(session.tokens().refresh_token().await.is_none());

        tokio::time::advance(Duration::from_millis(200)).await;
        assert_eq!(
            rx.recv().await.unwrap(),
            SessionEvent::AuthChanged {
                is_authenticated: false
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn current_user_is_throttled_locally() {
        let (session, transport) = session();
        transport.push_ok(
            200,
            serde_json::json!({ "success": true, "data": user_json() }),
        );

        session.current_user().await.unwrap();
        let err = session.current_user().await.unwrap_err();

        assert_eq!(err, SessionError::Throttled);
        assert_eq!(transport.call_count(), 1);

        // Past the throttle window and the dedup grace, the next fetch
        // goes out again.
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_millis(600)).await;
        tokio::task::yield_now().await;
        transport.push_ok(
            200,
            serde_json::json!({ "success": true, "data": user_json() }),
        );
        session.current_user().await.unwrap();
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn validate_answers_locally_right_after_login() {
        let (session, transport) = session();
        transport.push_ok(200, serde_json::json!({ "success": true, "data": {} }));

        session.login("jo@example.com", "pw").await.unwrap();
        let validation = session.validate().await.unwrap();

        assert!(validation.valid);
        // Only the login call hit the wire.
        assert_eq!(transport.call_count(), 1);

        // Outside the cooldown the real endpoint is asked.
        tokio::time::advance(Duration::from_millis(1100)).await;
        transport.push_ok(
            200,
            serde_json::json!({ "success": true, "data": { "valid": false } }),
        );
        let validation = session.validate().await.unwrap();
        assert!(!validation.valid);
        assert_eq!(transport.call_count(), 2);
    }
}
