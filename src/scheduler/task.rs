//! Cancellable periodic task

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Shared flag telling in-flight work whether its task is still running
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_live(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn kill(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// A job fired once immediately, then every `period` on the wall clock
///
/// Each firing runs as its own task, so a slow job never delays the next
/// tick. Cancelling stops the ticker and flips the shared `Liveness`, which
/// jobs must check before delivering a result.
pub struct PeriodicTask {
    name: &'static str,
    handle: JoinHandle<()>,
    live: Liveness,
}

impl PeriodicTask {
    /// Spawn the ticker; `job` builds the future for each firing
    pub fn spawn<F, Fut>(name: &'static str, period: Duration, mut job: F) -> Self
    where
        F: FnMut(Liveness) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let live = Liveness::new();
        let ticker_live = live.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                if !ticker_live.is_live() {
                    break;
                }
                tracing::trace!(task = name, "Tick");
                tokio::spawn(job(ticker_live.clone()));
            }
        });

        Self { name, handle, live }
    }

    /// Stop future ticks and mark in-flight work as cancelled
    pub fn cancel(&self) {
        if self.live.is_live() {
            tracing::debug!(task = self.name, "Cancelling periodic task");
        }
        self.live.kill();
        self.handle.abort();
    }

    pub fn is_live(&self) -> bool {
        self.live.is_live()
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.cancel();
    }
}
