//! Refresh controller: bounded retries, backoff, and a strike counter.
//!
//! One refresh runs at a time; concurrent callers join the in-flight
//! attempt. A call that exhausts its retries counts one strike, and at
//! the strike limit the controller signals `RedirectRequired` instead
//! of navigating anywhere itself.
//!
//! State machine per call: Idle -> Refreshing -> Success | Failure.
//! Failure returns to Idle; the strike counter is the sticky part that
//! outlives individual calls.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

use atrium_shared::dto::{RefreshRequest, TokenData};

use crate::config::SessionConfig;
use crate::credentials::{TokenPair, TokenStore};
use crate::error::SessionError;
use crate::events::{SessionEvent, SessionEvents};
use crate::notifier::AuthChangeNotifier;
use crate::transport::{ApiRequest, Transport, decode, require_data};

type Flight = Shared<BoxFuture<'static, Result<TokenPair, SessionError>>>;

/// Obtains fresh token pairs, tolerating transient failures.
#[derive(Clone)]
pub struct RefreshController {
    inner: Arc<RefreshInner>,
}

struct RefreshInner {
    config: SessionConfig,
    transport: Arc<dyn Transport>,
    tokens: TokenStore,
    notifier: AuthChangeNotifier,
    events: SessionEvents,
    active_path: Arc<Mutex<String>>,
    flight: Mutex<Option<Flight>>,
    consecutive_failures: AtomicU32,
}

impl RefreshController {
    pub fn new(
        config: SessionConfig,
        transport: Arc<dyn Transport>,
        tokens: TokenStore,
        notifier: AuthChangeNotifier,
        events: SessionEvents,
        active_path: Arc<Mutex<String>>,
    ) -> Self {
        Self {
            inner: Arc::new(RefreshInner {
                config,
                transport,
                tokens,
                notifier,
                events,
                active_path,
                flight: Mutex::new(None),
                consecutive_failures: AtomicU32::new(0),
            }),
        }
    }

    /// Refresh the access token.
    ///
    /// Preconditions are checked before any network traffic: without a
    /// refresh credential in either store this returns
    /// [`SessionError::NoRefreshToken`] immediately, and the strike
    /// counter is untouched.
    pub async fn refresh(&self) -> Result<TokenPair, SessionError> {
        self.inner.tokens.synchronize().await;
        let Some(refresh_token) = self.inner.tokens.refresh_token().await else {
            tracing::debug!("No refresh credential, skipping network refresh");
            return Err(SessionError::NoRefreshToken);
        };

        let flight = {
            let mut guard = self.inner.flight.lock().expect("refresh flight poisoned");
            if let Some(existing) = guard.as_ref() {
                tracing::debug!("Joining in-flight refresh");
                existing.clone()
            } else {
                let inner = Arc::clone(&self.inner);
                let flight: Flight = async move {
                    let result = inner.run(refresh_token).await;
                    inner
                        .flight
                        .lock()
                        .expect("refresh flight poisoned")
                        .take();
                    result
                }
                .boxed()
                .shared();
                *guard = Some(flight.clone());
                // Drive to completion even if every caller stops polling.
                tokio::spawn(flight.clone().map(|_| ()));
                flight
            }
        };

        flight.await
    }

    /// Strikes accumulated by calls that exhausted their retries.
    pub fn consecutive_failures(&self) -> u32 {
        self.inner.consecutive_failures.load(Ordering::SeqCst)
    }
}

impl RefreshInner {
    async fn run(&self, refresh_token: String) -> Result<TokenPair, SessionError> {
        let mut last_error = SessionError::Transport("refresh not attempted".to_string());

        for attempt in 0..self.config.refresh_attempts.max(1) {
            if attempt > 0 {
                let delay = self.config.backoff_base * 2u32.pow(attempt - 1);
                tracing::debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Backing off before refresh retry"
                );
                tokio::time::sleep(delay).await;
            }

            match self.attempt(&refresh_token).await {
                Ok(pair) => {
                    self.tokens.store(&pair).await;
                    self.consecutive_failures.store(0, Ordering::SeqCst);

                    // Give the caller a head start before listeners react.
                    let notifier = self.notifier.clone();
                    let delay = self.config.success_notify_delay;
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        notifier.notify(true);
                    });

                    tracing::info!("Access token refreshed");
                    return Ok(pair);
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Refresh attempt failed");
                    last_error = e;
                }
            }
        }

        let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::warn!(
            consecutive_failures = failures,
            "Refresh exhausted its retries"
        );

        if failures >= self.config.strike_limit {
            self.consecutive_failures.store(0, Ordering::SeqCst);
            let target = self.login_redirect_target();
            tracing::error!(target = %target, "Session beyond recovery, signalling redirect");
            self.events.emit(SessionEvent::RedirectRequired { target });
        }

        Err(last_error)
    }

    async fn attempt(&self, refresh_token: &str) -> Result<TokenPair, SessionError> {
        let request = ApiRequest::post("/api/auth/refresh").with_json(&RefreshRequest {
            refresh_token: refresh_token.to_string(),
        });
        let raw = self.transport.execute(request).await?;
        let data = require_data(decode::<TokenData>(raw)?)?;
        Ok(TokenPair::new(data.access_token, data.refresh_token))
    }

    fn login_redirect_target(&self) -> String {
        let return_path = self
            .active_path
            .lock()
            .expect("active path poisoned")
            .clone();
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("returnUrl", &return_path)
            .finish();
        format!("{}?{}", self.config.login_path, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::credentials::REFRESH_BACKUP_SLOT;
    use crate::credentials::{CredentialStore, InMemoryCredentialStore};
    use crate::notifier::NotifierConfig;
    use crate::transport::testing::MockTransport;

    struct Harness {
        controller: RefreshController,
        transport: Arc<MockTransport>,
        tokens: TokenStore,
        events: SessionEvents,
        backup: Arc<InMemoryCredentialStore>,
    }

    fn harness() -> Harness {
        let config = SessionConfig::default();
        let transport = Arc::new(MockTransport::new());
        let primary = Arc::new(InMemoryCredentialStore::new());
        let backup = Arc::new(InMemoryCredentialStore::new());
        let tokens = TokenStore::new(primary, backup.clone());
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
        let controller = RefreshController::new(
            config,
            transport.clone(),
            tokens.clone(),
            notifier,
            events.clone(),
            Arc::new(Mutex::new("/dashboard".to_string())),
        );
        Harness {
            controller,
            transport,
            tokens,
            events,
            backup,
        }
    }

    fn token_body(access: &str, refresh: &str) -> serde_json::Value {
        serde_json::json!({
            "success": true,
            "data": {
                "access_token": access,
                "refresh_token": refresh,
                "expires_in": 900
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn no_credential_short_circuits_without_network() {
        let h = harness();

        let result = h.controller.refresh().await;

        assert_eq!(result.unwrap_err(), SessionError::NoRefreshToken);
        assert_eq!(h.transport.call_count(), 0);
        assert_eq!(h.controller.consecutive_failures(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn success_stores_tokens_and_notifies_after_delay() {
        let h = harness();
        h.backup.set(REFRESH_BACKUP_SLOT, "r-old").await.unwrap();
        h.transport.push_ok(200, token_body("a-new", "r-new"));
        let mut rx = h.events.subscribe();

        let pair = h.controller.refresh().await.unwrap();
        assert_eq!(pair.access_token, "a-new");

        assert_eq!(h.tokens.access_token().await.as_deref(), Some("a-new"));
        assert_eq!(h.tokens.refresh_token().await.as_deref(), Some("r-new"));

        // Notification arrives only after the post-success delay.
        tokio::time::advance(Duration::from_millis(250)).await;
        assert_eq!(
            rx.recv().await.unwrap(),
            SessionEvent::AuthChanged {
                is_authenticated: true
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried_with_backoff() {
        let h = harness();
        h.backup.set(REFRESH_BACKUP_SLOT, "r-old").await.unwrap();
        h.transport.push_raw(Ok(crate::transport::RawResponse {
            status: 500,
            body: None,
        }));
        h.transport.push_raw(Ok(crate::transport::RawResponse {
            status: 500,
            body: None,
        }));
        h.transport.push_ok(200, token_body("a", "r"));

        let pair = h.controller.refresh().await.unwrap();

        assert_eq!(pair.refresh_token, "r");
        assert_eq!(h.transport.call_count(), 3);
        assert_eq!(h.controller.consecutive_failures(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn third_consecutive_failure_signals_redirect() {
        let h = harness();
        h.backup.set(REFRESH_BACKUP_SLOT, "r-old").await.unwrap();
        let mut rx = h.events.subscribe();
        // MockTransport answers 500 once scripted responses run out, so
        // every attempt of every call fails.

        for expected_failures in [1, 2] {
            let result = h.controller.refresh().await;
            assert!(matches!(result, Err(SessionError::Http { status: 500, .. })));
            assert_eq!(h.controller.consecutive_failures(), expected_failures);
        }

        let result = h.controller.refresh().await;
        assert!(result.is_err());
        assert_eq!(h.controller.consecutive_failures(), 0);

        assert_eq!(
            rx.recv().await.unwrap(),
            SessionEvent::RedirectRequired {
                target: "/auth/login?returnUrl=%2Fdashboard".to_string()
            }
        );
        // 3 calls x 3 attempts each.
        assert_eq!(h.transport.call_count(), 9);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_flight() {
        let h = harness();
        h.backup.set(REFRESH_BACKUP_SLOT, "r-old").await.unwrap();
        h.transport.push_ok(200, token_body("a", "r"));

        let (first, second) = tokio::join!(h.controller.refresh(), h.controller.refresh());

        assert_eq!(first.unwrap(), second.unwrap());
        assert_eq!(h.transport.call_count(), 1);
    }
}
