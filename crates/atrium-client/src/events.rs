//! Session event bus.
//!
//! One broadcast stream carries everything the embedding application
//! needs to react to: auth state transitions and redirect signals.

use tokio::sync::broadcast;

/// Events emitted by the session layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The (collapsed) authentication state changed.
    AuthChanged { is_authenticated: bool },
    /// The session is beyond recovery; the embedder should navigate to
    /// `target` (login page with a returnUrl parameter).
    RedirectRequired { target: String },
}

/// Handle to the session event bus. Cloning shares the same stream.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to session events. Slow receivers may lag and miss
    /// intermediate events; the latest state is what matters.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Emit an event. Having no listeners is not an error.
    pub fn emit(&self, event: SessionEvent) {
        if self.sender.send(event.clone()).is_err() {
            tracing::debug!(?event, "Session event dropped, no subscribers");
        }
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new(16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_emitted_events() {
        let events = SessionEvents::default();
        let mut rx = events.subscribe();

        events.emit(SessionEvent::AuthChanged {
            is_authenticated: true,
        });

        assert_eq!(
            rx.recv().await.unwrap(),
            SessionEvent::AuthChanged {
                is_authenticated: true
            }
        );
    }

    #[test]
    fn emitting_without_subscribers_is_fine() {
        let events = SessionEvents::default();
        events.emit(SessionEvent::RedirectRequired {
            target: "/auth/login".into(),
        });
    }
}
