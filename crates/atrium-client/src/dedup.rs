//! Request deduplication: concurrent identical calls share one flight.
//!
//! A best-effort race suppressor, not a correctness guarantee - it
//! narrows the window for duplicate credential writes but cannot close
//! it across processes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

type Flight<T> = Shared<BoxFuture<'static, T>>;

/// Keyed map of shared in-flight futures.
///
/// Key discipline is the caller's job: keys that embed a timestamp only
/// collapse same-instant duplicates, fixed keys collapse every
/// concurrent caller onto one flight.
pub struct Deduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    in_flight: Arc<Mutex<HashMap<String, Flight<T>>>>,
    grace: Duration,
}

impl<T> Deduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// `grace` keeps a completed entry registered a little longer to
    /// absorb near-simultaneous duplicate calls.
    pub fn new(grace: Duration) -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            grace,
        }
    }

    /// Join the flight registered under `key`, or start one with `make`.
    ///
    /// The flight is driven by a watcher task, so a caller dropping its
    /// await does not cancel the underlying request. The registration is
    /// removed after completion plus the grace delay.
    pub async fn run<F, Fut>(&self, key: &str, make: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let flight = {
            let mut in_flight = self.in_flight.lock().expect("dedup map poisoned");
            if let Some(existing) = in_flight.get(key) {
                tracing::debug!(key, "Joining in-flight request");
                existing.clone()
            } else {
                let flight: Flight<T> = make().boxed().shared();
                in_flight.insert(key.to_string(), flight.clone());

                let map = Arc::clone(&self.in_flight);
                let key = key.to_string();
                let grace = self.grace;
                let watcher = flight.clone();
                tokio::spawn(async move {
                    let _ = watcher.await;
                    tokio::time::sleep(grace).await;
                    map.lock().expect("dedup map poisoned").remove(&key);
                });

                flight
            }
        };

        flight.await
    }

    /// Number of registered flights (completed-but-in-grace included).
    pub fn len(&self) -> usize {
        self.in_flight.lock().expect("dedup map poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn same_tick_callers_share_one_invocation() {
        let dedup: Deduplicator<u32> = Deduplicator::new(Duration::from_millis(100));
        let invocations = Arc::new(AtomicU32::new(0));

        let make = |n: Arc<AtomicU32>| {
            move || async move {
                n.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                42u32
            }
        };

        let (a, b) = tokio::join!(
            dedup.run("k", make(invocations.clone())),
            dedup.run("k", make(invocations.clone())),
        );

        assert_eq!(a, 42);
        assert_eq!(b, 42);
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn distinct_keys_do_not_collapse()  {
        let dedup: Deduplicator<u32> = Deduplicator::new(Duration::from_millis(100));
        let invocations = Arc::new(AtomicU32::new(0));

        for key in ["login-a@example.com-1", "login-a@example.com-2"] {
            let n = invocations.clone();
            dedup
                .run(key, move || async move {
                    n.fetch_add(1, Ordering::SeqCst);
                    7
                })
                .await;
        }

        assert_eq!(invocations.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn registration_is_removed_after_grace() {
        let dedup: Deduplicator<u32> = Deduplicator::new(Duration::from_millis(100));

        dedup.run("k", || async { 1 }).await;
        assert_eq!(dedup.len(), 1);
        // Let the watcher start its grace timer.
        tokio::task::yield_now().await;

        // Grace has not elapsed yet; the entry lingers.
        tokio::time::advance(Duration::from_millis(50)).await;
        assert_eq!(dedup.len(), 1);

        tokio::time::advance(Duration::from_millis(60)).await;
        tokio::task::yield_now().await;
        assert_eq!(dedup.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_shared_too() {
        let dedup: Deduplicator<Result<u32, String>> =
            Deduplicator::new(Duration::from_millis(100));

        let (a, b) = tokio::join!(
            dedup.run("k", || async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Err::<u32, _>("boom".to_string())
            }),
            dedup.run("k", || async { Ok(1) }),
        );

        assert_eq!(a, Err("boom".to_string()));
        assert_eq!(b, Err("boom".to_string()));
    }
}
