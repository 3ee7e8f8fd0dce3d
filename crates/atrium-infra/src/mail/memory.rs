//! In-memory mail queue implementation.
//!
//! Delivery happens from local worker tasks; queued mail is lost on
//! process restart.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use atrium_core::ports::{MailJob, MailOutcome, MailQueue, MailQueueError, MailSender, MailStats};

/// In-memory mail queue configuration.
#[derive(Debug, Clone)]
pub struct InMemoryMailQueueConfig {
    /// Maximum queue size (0 = unlimited).
    pub max_size: usize,
    /// Number of delivery workers.
    pub workers: usize,
}

impl Default for InMemoryMailQueueConfig {
    fn default() -> Self {
        Self {
            max_size: 1000,
            workers: 2,
        }
    }
}

/// In-memory mail queue.
pub struct InMemoryMailQueue {
    stats: Arc<QueueCounters>,
    config: InMemoryMailQueueConfig,
    job_sender: mpsc::Sender<MailJob>,
    job_receiver: Arc<Mutex<mpsc::Receiver<MailJob>>>,
}

struct QueueCounters {
    pending: AtomicUsize,
    processing: AtomicUsize,
    sent: AtomicUsize,
    failed: AtomicUsize,
}

impl InMemoryMailQueue {
    pub fn new(config: InMemoryMailQueueConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.max_size.max(100));

        Self {
            stats: Arc::new(QueueCounters {
                pending: AtomicUsize::new(0),
                processing: AtomicUsize::new(0),
                sent: AtomicUsize::new(0),
                failed: AtomicUsize::new(0),
            }),
            config,
            job_sender: tx,
            job_receiver: Arc::new(Mutex::new(rx)),
        }
    }

    pub fn from_env() -> Self {
        let config = InMemoryMailQueueConfig {
            max_size: std::env::var("MAIL_QUEUE_MAX_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1000),
            workers: std::env::var("MAIL_QUEUE_WORKERS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
        };
        Self::new(config)
    }
}

#[async_trait]
impl MailQueue for InMemoryMailQueue {
    async fn enqueue(&self, job: MailJob) -> Result<(), MailQueueError> {
        if self.config.max_size > 0 {
            let current_size = self.stats.pending.load(Ordering::Relaxed);
            if current_size >= self.config.max_size {
                return Err(MailQueueError::QueueFull);
            }
        }

        self.stats.pending.fetch_add(1, Ordering::Relaxed);

        self.job_sender
            .send(job)
            .await
            .map_err(|e| MailQueueError::EnqueueError(e.to_string()))?;

        tracing::debug!(
            "Mail enqueued. Queue size: {}",
            self.stats.pending.load(Ordering::Relaxed)
        );

        Ok(())
    }

    async fn start_worker(&self, sender: MailSender) -> Result<(), MailQueueError> {
        let sender = Arc::new(sender);
        let receiver = self.job_receiver.clone();
        let stats = self.stats.clone();
        let requeue = self.job_sender.clone();

        for worker_id in 0..self.config.workers {
            let sender = sender.clone();
            let receiver = receiver.clone();
            let stats = stats.clone();
            let requeue = requeue.clone();

            tokio::spawn(async move {
                tracing::info!("Mail worker {} started", worker_id);

                loop {
                    let job = {
                        let mut rx = receiver.lock().await;
                        rx.recv().await
                    };

                    let Some(mut job) = job else {
                        tracing::info!("Mail worker {} shutting down", worker_id);
                        break;
                    };

                    stats.pending.fetch_sub(1, Ordering::Relaxed);
                    stats.processing.fetch_add(1, Ordering::Relaxed);

                    job.attempts += 1;
                    let outcome = sender(job.clone()).await;

                    stats.processing.fetch_sub(1, Ordering::Relaxed);

                    match outcome {
                        MailOutcome::Sent => {
                            stats.sent.fetch_add(1, Ordering::Relaxed);
                            tracing::debug!(mail_id = %job.id, to = %job.to, "Mail delivered");
                        }
                        MailOutcome::Retry(reason) => {
                            if job.attempts < job.max_attempts {
                                tracing::warn!(
                                    mail_id = %job.id,
                                    attempt = job.attempts,
                                    reason = %reason,
                                    "Delivery failed, will retry"
                                );
                                stats.pending.fetch_add(1, Ordering::Relaxed);
                                let requeue = requeue.clone();
                                // Spread retries out instead of hammering the backend
                                tokio::spawn(async move {
                                    tokio::time::sleep(tokio::time::Duration::from_millis(
                                        100 * job.attempts as u64,
                                    ))
                                    .await;
                                    if let Err(e) = requeue.send(job).await {
                                        tracing::error!("Failed to requeue mail: {}", e);
                                    }
                                });
                            } else {
                                stats.failed.fetch_add(1, Ordering::Relaxed);
                                tracing::error!(
                                    mail_id = %job.id,
                                    reason = %reason,
                                    "Delivery failed after max retries"
                                );
                            }
                        }
                        MailOutcome::Failed(reason) => {
                            stats.failed.fetch_add(1, Ordering::Relaxed);
                            tracing::error!(mail_id = %job.id, reason = %reason, "Delivery failed permanently");
                        }
                    }
                }
            });
        }

        Ok(())
    }

    async fn stats(&self) -> Result<MailStats, MailQueueError> {
        Ok(MailStats {
            pending: self.stats.pending.load(Ordering::Relaxed),
            processing: self.stats.processing.load(Ordering::Relaxed),
            sent: self.stats.sent.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn delivers_enqueued_mail() {
        let queue = InMemoryMailQueue::new(InMemoryMailQueueConfig {
            max_size: 10,
            workers: 1,
        });

        let delivered = Arc::new(Mutex::new(Vec::new()));
        let sink = delivered.clone();
        queue
            .start_worker(Box::new(move |job| {
                let sink = sink.clone();
                Box::pin(async move {
                    sink.lock().await.push(job.to.clone());
                    MailOutcome::Sent
                })
            }))
            .await
            .unwrap();

        queue
            .enqueue(MailJob::new("jo@example.com", "Reset", "..."))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(delivered.lock().await.as_slice(), ["jo@example.com"]);
        let stats = queue.stats().await.unwrap();
        assert_eq!(stats.sent, 1);
        assert_eq!(stats.pending, 0);
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let queue = InMemoryMailQueue::new(InMemoryMailQueueConfig {
            max_size: 10,
            workers: 1,
        });

        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        queue
            .start_worker(Box::new(move |_job| {
                counter.fetch_add(1, Ordering::Relaxed);
                Box::pin(async move { MailOutcome::Failed("bad address".into()) })
            }))
            .await
            .unwrap();

        queue
            .enqueue(MailJob::new("nope", "Reset", "..."))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(attempts.load(Ordering::Relaxed), 1);
        assert_eq!(queue.stats().await.unwrap().failed, 1);
    }
}
