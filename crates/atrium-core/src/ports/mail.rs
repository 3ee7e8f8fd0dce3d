//! Outbound mail port - queued delivery of transactional mail
//! (password resets, appointment notifications).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// A queued outbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailJob {
    pub id: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attempts: u32,
    pub max_attempts: u32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl MailJob {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
            attempts: 0,
            max_attempts: 3,
            created_at: chrono::Utc::now(),
        }
    }

    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max;
        self
    }
}

/// Result of a delivery attempt.
#[derive(Debug)]
pub enum MailOutcome {
    /// Delivered.
    Sent,
    /// Transient failure, requeue.
    Retry(String),
    /// Permanent failure, drop.
    Failed(String),
}

/// Delivery function. Boxed so the queue stays usable as a trait object.
pub type MailSender =
    Box<dyn Fn(MailJob) -> Pin<Box<dyn Future<Output = MailOutcome> + Send>> + Send + Sync>;

/// Mail queue trait - abstraction over delivery backends.
#[async_trait]
pub trait MailQueue: Send + Sync {
    /// Enqueue a message for delivery.
    async fn enqueue(&self, job: MailJob) -> Result<(), MailQueueError>;

    /// Start delivering queued mail with the given sender.
    async fn start_worker(&self, sender: MailSender) -> Result<(), MailQueueError>;

    /// Queue statistics.
    async fn stats(&self) -> Result<MailStats, MailQueueError>;
}

/// Queue statistics.
#[derive(Debug, Clone, Default)]
pub struct MailStats {
    pub pending: usize,
    pub processing: usize,
    pub sent: usize,
    pub failed: usize,
}

/// Mail queue errors.
#[derive(Debug, thiserror::Error)]
pub enum MailQueueError {
    #[error("Failed to enqueue mail: {0}")]
    EnqueueError(String),

    #[error("Queue is full")]
    QueueFull,

    #[error("Backend error: {0}")]
    Backend(String),
}
