//! Single-shot coalescing timer
//!
//! Each [`Debouncer::schedule`] call replaces the pending task, so a burst of
//! calls fires once, `delay` after the last one. The pending task is aborted
//! on [`Debouncer::cancel`] and on drop.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Cancellable delayed callback, at most one pending at a time
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    /// Create an idle debouncer
    pub fn new(delay: Duration) -> Self {
        Self { delay, pending: None }
    }

    /// Quiet period before firing
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether a task is waiting to fire
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Run `fire` after the delay, replacing any pending run
    ///
    /// Outside a Tokio runtime there is nothing to wait on, so `fire` runs
    /// immediately.
    pub fn schedule<F>(&mut self, fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();

        let Ok(handle) = Handle::try_current() else {
            tracing::warn!("No Tokio runtime for debounce timer, firing immediately");
            fire();
            return;
        };

        let deadline = Instant::now() + self.delay;
        self.pending = Some(handle.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            fire();
        }));
    }

    /// Abort the pending run, if any
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> Box<dyn FnOnce() + Send>) {
        let count = Arc::new(AtomicUsize::new(0));
        let make = {
            let count = Arc::clone(&count);
            move || -> Box<dyn FnOnce() + Send> {
                let count = Arc::clone(&count);
                Box::new(move || {
                    count.fetch_add(1, Ordering::SeqCst);
                })
            }
        };
        (count, make)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_delay() {
        let (count, make) = counter();
        let mut debouncer = Debouncer::new(Duration::from_millis(500));

        debouncer.schedule(make());
        tokio::time::sleep(Duration::from_millis(499)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_restarts_timer() {
        let (count, make) = counter();
        let mut debouncer = Debouncer::new(Duration::from_millis(500));

        for _ in 0..3 {
            debouncer.schedule(make());
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        // 300ms in, 100ms after the last call
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_and_drop_prevent_firing() {
        let (count, make) = counter();

        let mut debouncer = Debouncer::new(Duration::from_millis(50));
        debouncer.schedule(make());
        debouncer.cancel();

        let mut dropped = Debouncer::new(Duration::from_millis(50));
        dropped.schedule(make());
        drop(dropped);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_without_runtime_fires_immediately() {
        let (count, make) = counter();
        let mut debouncer = Debouncer::new(Duration::from_millis(500));

        debouncer.schedule(make());

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending());
    }
}
