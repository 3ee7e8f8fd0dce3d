//! Session configuration.
//!
//! Every timing window the session layer uses lives here rather than in
//! hardcoded constants, so tests and embedders can tighten or relax them.

use std::time::Duration;

/// Configuration for [`crate::SessionManager`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base URL of the API server, e.g. `https://api.example.com`.
    pub base_url: String,
    /// Path the embedder should navigate to when the session is lost.
    pub login_path: String,

    /// Debounce before a queued auth change is dispatched.
    pub notify_debounce: Duration,
    /// Minimum interval between notify calls that may schedule a dispatch.
    pub notify_min_interval: Duration,
    /// Cooldown after a dispatch during which new changes only queue.
    pub notify_cooldown: Duration,
    /// Retry delay when a dispatch finds another dispatch in progress.
    pub dispatch_retry: Duration,

    /// How long a completed in-flight entry lingers in the deduplicator.
    pub dedup_grace: Duration,

    /// Total refresh attempts per call (first try included).
    pub refresh_attempts: u32,
    /// Base for the exponential backoff between refresh attempts.
    pub backoff_base: Duration,
    /// Consecutive failed refresh calls before a redirect is signalled.
    pub strike_limit: u32,
    /// Delay before the post-refresh "authenticated" notification.
    pub success_notify_delay: Duration,

    /// Minimum interval between current-user fetches.
    pub user_fetch_min_interval: Duration,
    /// Window after an auth change in which validate() answers locally.
    pub validate_cooldown: Duration,
}

impl SessionConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            login_path: "/auth/login".to_string(),
            notify_debounce: Duration::from_millis(150),
            notify_min_interval: Duration::from_millis(300),
            notify_cooldown: Duration::from_secs(2),
            dispatch_retry: Duration::from_millis(300),
            dedup_grace: Duration::from_millis(100),
            refresh_attempts: 3,
            backoff_base: Duration::from_millis(300),
            strike_limit: 3,
            success_notify_delay: Duration::from_millis(50),
            user_fetch_min_interval: Duration::from_millis(500),
            validate_cooldown: Duration::from_secs(1),
        }
    }
}
