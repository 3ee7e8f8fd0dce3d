//! Debounced auth change notifier.
//!
//! Collapses bursts of login/logout transitions into single events:
//! listeners only ever see the latest state of a rapid burst, never
//! every intermediate state. This is an explicit last-write-wins
//! collapse, not an ordered stream.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use crate::events::{SessionEvent, SessionEvents};

/// Timing windows for the notifier.
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Delay between the first queued change and its dispatch.
    pub debounce: Duration,
    /// Notify calls closer together than this only queue.
    pub min_interval: Duration,
    /// After a dispatch, further calls only queue for this long.
    pub cooldown: Duration,
    /// Retry delay when a dispatch overlaps another dispatch.
    pub dispatch_retry: Duration,
}

#[derive(Debug, Clone)]
struct PendingChange {
    is_authenticated: bool,
    queued_at: Instant,
}

#[derive(Debug, Default)]
struct NotifierState {
    queue: Vec<PendingChange>,
    dispatch_scheduled: bool,
    dispatching: bool,
    last_notify: Option<Instant>,
    last_dispatch: Option<Instant>,
}

/// Debounced, cooldown-gated notifier over the session event bus.
#[derive(Clone)]
pub struct AuthChangeNotifier {
    inner: Arc<NotifierInner>,
}

struct NotifierInner {
    config: NotifierConfig,
    events: SessionEvents,
    state: Mutex<NotifierState>,
}

impl AuthChangeNotifier {
    pub fn new(config: NotifierConfig, events: SessionEvents) -> Self {
        Self {
            inner: Arc::new(NotifierInner {
                config,
                events,
                state: Mutex::new(NotifierState::default()),
            }),
        }
    }

    /// Queue an auth state change. Outside the cooldown and minimum
    /// interval windows this also schedules a dispatch after the
    /// debounce delay; inside them the call queues and nothing more.
    pub fn notify(&self, is_authenticated: bool) {
        let now = Instant::now();
        let schedule = {
            let mut state = self.inner.state.lock().expect("notifier state poisoned");
            state.queue.push(PendingChange {
                is_authenticated,
                queued_at: now,
            });

            let within_min_interval = state
                .last_notify
                .is_some_and(|t| now.duration_since(t) < self.inner.config.min_interval);
            let within_cooldown = state
                .last_dispatch
                .is_some_and(|t| now.duration_since(t) < self.inner.config.cooldown);
            state.last_notify = Some(now);

            if state.dispatch_scheduled || within_min_interval || within_cooldown {
                tracing::trace!(
                    is_authenticated,
                    within_min_interval,
                    within_cooldown,
                    "Auth change queued"
                );
                false
            } else {
                state.dispatch_scheduled = true;
                true
            }
        };

        if schedule {
            let inner = Arc::clone(&self.inner);
            let delay = self.inner.config.debounce;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                NotifierInner::dispatch_now(inner);
            });
        }
    }

    /// Instant of the most recent dispatched change, if any.
    pub fn last_dispatch(&self) -> Option<Instant> {
        self.inner
            .state
            .lock()
            .expect("notifier state poisoned")
            .last_dispatch
    }
}

impl NotifierInner {
    fn dispatch_now(inner: Arc<Self>) {
        let latest = {
            let mut state = inner.state.lock().expect("notifier state poisoned");
            if state.dispatching {
                // Another dispatch is mid-flight; come back later.
                let retry = inner.config.dispatch_retry;
                let inner = Arc::clone(&inner);
                tokio::spawn(async move {
                    tokio::time::sleep(retry).await;
                    Self::dispatch_now(inner);
                });
                return;
            }
            state.dispatching = true;

            let latest = state
                .queue
                .iter()
                .max_by_key(|change| change.queued_at)
                .cloned();
            state.queue.clear();
            latest
        };

        let dispatched = latest.is_some();
        if let Some(change) = latest {
            tracing::debug!(
                is_authenticated = change.is_authenticated,
                "Dispatching auth change"
            );
            inner.events.emit(SessionEvent::AuthChanged {
                is_authenticated: change.is_authenticated,
            });
        }

        let mut state = inner.state.lock().expect("notifier state poisoned");
        state.dispatching = false;
        state.dispatch_scheduled = false;
        if dispatched {
            state.last_dispatch = Some(Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    fn notifier() -> (AuthChangeNotifier, tokio::sync::broadcast::Receiver<SessionEvent>) {
        let events = SessionEvents::default();
        let rx = events.subscribe();
        let config = NotifierConfig {
            debounce: Duration::from_millis(150),
            min_interval: Duration::from_millis(300),
            cooldown: Duration::from_secs(2),
            dispatch_retry: Duration::from_millis(300),
        };
        (AuthChangeNotifier::new(config, events), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn burst_collapses_to_latest_state() {
        let (notifier, mut rx) = notifier();

        notifier.notify(true);
        notifier.notify(false);
        notifier.notify(true);

        tokio::time::advance(Duration::from_millis(200)).await;

        assert_eq!(
            rx.recv().await.unwrap(),
            SessionEvent::AuthChanged {
                is_authenticated: true
            }
        );
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test(start_paused = true)]
    async fn logout_wins_when_it_is_last() {
        let (notifier, mut rx) = notifier();

        notifier.notify(true);
        notifier.notify(false);

        tokio::time::advance(Duration::from_millis(200)).await;

        assert_eq!(
            rx.recv().await.unwrap(),
            SessionEvent::AuthChanged {
                is_authenticated: false
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn calls_inside_cooldown_only_queue() {
        let (notifier, mut rx) = notifier();

        notifier.notify(true);
        tokio::time::advance(Duration::from_millis(200)).await;
        rx.recv().await.unwrap();

        // Inside the 2s cooldown: queues, but no dispatch is scheduled.
        notifier.notify(false);
        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test(start_paused = true)]
    async fn next_burst_after_cooldown_flushes_queue() {
        let (notifier, mut rx) = notifier();

        notifier.notify(true);
        tokio::time::advance(Duration::from_millis(200)).await;
        rx.recv().await.unwrap();

        // Swallowed by the cooldown.
        notifier.notify(false);

        // Well past cooldown and minimum interval: schedules again and
        // the queued entry from the cooldown window rides along.
        tokio::time::advance(Duration::from_secs(3)).await;
        notifier.notify(true);
        tokio::time::advance(Duration::from_millis(200)).await;

        assert_eq!(
            rx.recv().await.unwrap(),
            SessionEvent::AuthChanged {
                is_authenticated: true
            }
        );
    }
}
