//! Fallback Scheduler - per-key debounced watchdog timers
//!
//! A timer fires only when the push channel has been silent for the full
//! delay window; every accepted push re-arms it, so healthy push delivery
//! fully suppresses pull traffic. This is a watchdog, not a poller.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct TimerSlot {
    generation: u64,
    token: CancellationToken,
}

/// Per-key debounced timer set.
///
/// At most one pending timer per key: (re)arming cancels and replaces any
/// prior timer for that key. The scheduler never re-arms by itself - after a
/// completed or failed action, re-arming is the caller's responsibility,
/// which keeps a failing refresh from silently starving forever.
pub struct FallbackScheduler {
    timers: Mutex<HashMap<String, TimerSlot>>,
    next_generation: AtomicU64,
}

impl FallbackScheduler {
    pub fn new() -> Self {
        Self {
            timers: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Schedule `action` to run after `delay`, replacing any pending timer
    /// for `key`.
    pub fn arm<F, Fut>(self: &Arc<Self>, key: &str, delay: Duration, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();

        {
            let mut timers = self.timers.lock().unwrap();
            if let Some(previous) = timers.insert(
                key.to_string(),
                TimerSlot {
                    generation,
                    token: token.clone(),
                },
            ) {
                previous.token.cancel();
            }
        }

        let scheduler = Arc::clone(self);
        let key = key.to_string();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = token.cancelled() => return,
            }

            // Drop our slot unless a newer timer replaced it while firing
            let still_current = {
                let mut timers = scheduler.timers.lock().unwrap();
                let matches = timers
                    .get(&key)
                    .is_some_and(|slot| slot.generation == generation);
                if matches {
                    timers.remove(&key);
                }
                matches
            };
            if !still_current {
                return;
            }

            action().await;
        });
    }

    /// Remove a pending timer; no-op if none exists
    pub fn cancel(&self, key: &str) {
        if let Some(slot) = self.timers.lock().unwrap().remove(key) {
            slot.token.cancel();
        }
    }

    /// Cancel every pending timer
    pub fn cancel_all(&self) {
        let mut timers = self.timers.lock().unwrap();
        for (_, slot) in timers.drain() {
            slot.token.cancel();
        }
    }

    /// Whether a timer is currently pending for `key`
    pub fn is_armed(&self, key: &str) -> bool {
        self.timers.lock().unwrap().contains_key(key)
    }
}

impl Default for FallbackScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn counting_action(counter: &Arc<AtomicU32>) -> impl FnOnce() -> futures::future::Ready<()> + use<> {
        let counter = counter.clone();
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            futures::future::ready(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_after_delay() {
        let scheduler = Arc::new(FallbackScheduler::new());
        let fired = Arc::new(AtomicU32::new(0));

        scheduler.arm("k", Duration::from_millis(100), counting_action(&fired));
        assert!(scheduler.is_armed("k"));

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_armed("k"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_slides_the_window() {
        let scheduler = Arc::new(FallbackScheduler::new());
        let fired = Arc::new(AtomicU32::new(0));

        scheduler.arm("k", Duration::from_millis(100), counting_action(&fired));
        tokio::time::sleep(Duration::from_millis(60)).await;

        // Re-arm before the first deadline: firing time shifts forward
        scheduler.arm("k", Duration::from_millis(100), counting_action(&fired));
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_at_most_one_timer_per_key() {
        let scheduler = Arc::new(FallbackScheduler::new());
        let fired = Arc::new(AtomicU32::new(0));

        for _ in 0..5 {
            scheduler.arm("k", Duration::from_millis(50), counting_action(&fired));
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_is_idempotent() {
        let scheduler = Arc::new(FallbackScheduler::new());
        let fired = Arc::new(AtomicU32::new(0));

        scheduler.arm("k", Duration::from_millis(50), counting_action(&fired));
        scheduler.cancel("k");
        scheduler.cancel("k");
        scheduler.cancel("missing");

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let scheduler = Arc::new(FallbackScheduler::new());
        let fired_a = Arc::new(AtomicU32::new(0));
        let fired_b = Arc::new(AtomicU32::new(0));

        scheduler.arm("a", Duration::from_millis(50), counting_action(&fired_a));
        scheduler.arm("b", Duration::from_millis(50), counting_action(&fired_b));
        scheduler.cancel("a");

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired_a.load(Ordering::SeqCst), 0);
        assert_eq!(fired_b.load(Ordering::SeqCst), 1);
    }
}
