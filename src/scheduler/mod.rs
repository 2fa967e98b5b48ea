//! Polling scheduler
//!
//! Drives two independent periodic refreshes:
//! - broad: every tracked symbol in one batched call
//! - detail: full quote for the selected symbol, tagged with its generation
//!
//! Every fetch carries a sequence number taken when it is issued, so the
//! receiver can drop a slow fetch that finishes after a newer one. Results
//! are delivered on a channel; the receiver applies them on a single task.

mod task;

pub use task::{Liveness, PeriodicTask};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::quote::{Quote, QuoteError, QuoteSource, Symbol};
use crate::session::DetailTag;
use crate::telemetry::{self, CounterMetric, LatencyMetric};

/// Polling cadence
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Broad multi-symbol refresh period (default: 30s)
    pub broad_period: Duration,
    /// Selected-symbol detail refresh period (default: 15s)
    pub detail_period: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            broad_period: Duration::from_secs(30),
            detail_period: Duration::from_secs(15),
        }
    }
}

/// A completed fetch, ready to be applied to the session
#[derive(Debug)]
pub enum TickEvent {
    Broad {
        /// Issue order within the broad task, starting at 1
        seq: u64,
        result: Result<HashMap<Symbol, Quote>, QuoteError>,
    },
    Detail {
        tag: DetailTag,
        result: Result<Quote, QuoteError>,
    },
}

impl TickEvent {
    fn refresh(&self) -> &'static str {
        match self {
            TickEvent::Broad { .. } => "broad",
            TickEvent::Detail { .. } => "detail",
        }
    }
}

/// Queue `event` unless its task was cancelled, including while waiting
/// for channel capacity
async fn deliver(events: &mpsc::Sender<TickEvent>, live: &Liveness, event: TickEvent) {
    let Ok(permit) = events.reserve().await else {
        return;
    };
    if !live.is_live() {
        tracing::debug!(refresh = event.refresh(), "Refresh cancelled, dropping result");
        telemetry::increment(CounterMetric::StaleResults);
        return;
    }
    permit.send(event);
}

/// Owns the broad and detail refresh tasks
pub struct PollingScheduler {
    source: Arc<dyn QuoteSource>,
    tracked: Arc<[Symbol]>,
    config: SchedulerConfig,
    events: mpsc::Sender<TickEvent>,
    broad: Option<PeriodicTask>,
    detail: Option<PeriodicTask>,
}

impl PollingScheduler {
    /// Create a stopped scheduler and the receiver for its results
    pub fn new(
        source: Arc<dyn QuoteSource>,
        tracked: Vec<Symbol>,
        config: SchedulerConfig,
    ) -> (Self, mpsc::Receiver<TickEvent>) {
        let (events, rx) = mpsc::channel(64);
        let scheduler = Self {
            source,
            tracked: tracked.into(),
            config,
            events,
            broad: None,
            detail: None,
        };
        (scheduler, rx)
    }

    /// Start both tasks; each fires immediately
    pub fn start(&mut self, tag: DetailTag) {
        self.start_broad();
        self.restart_detail(tag);
    }

    fn start_broad(&mut self) {
        if let Some(old) = self.broad.take() {
            old.cancel();
        }

        let source = Arc::clone(&self.source);
        let tracked = Arc::clone(&self.tracked);
        let events = self.events.clone();

        tracing::info!(
            symbols = tracked.len(),
            period_secs = self.config.broad_period.as_secs(),
            "Starting broad refresh"
        );

        let mut issued = 0u64;
        self.broad = Some(PeriodicTask::spawn(
            "broad",
            self.config.broad_period,
            move |live| {
                issued += 1;
                let seq = issued;
                let source = Arc::clone(&source);
                let tracked = Arc::clone(&tracked);
                let events = events.clone();
                async move {
                    let started = Instant::now();
                    let result = source.fetch_many(&tracked).await;
                    telemetry::record_latency(LatencyMetric::BroadFetch, started.elapsed());

                    deliver(&events, &live, TickEvent::Broad { seq, result }).await;
                }
            },
        ));
    }

    /// Cancel the detail task and start a new one for `tag`
    ///
    /// The broad task is left running.
    pub fn restart_detail(&mut self, tag: DetailTag) {
        if let Some(old) = self.detail.take() {
            old.cancel();
        }

        let source = Arc::clone(&self.source);
        let events = self.events.clone();

        tracing::info!(
            symbol = %tag.symbol,
            generation = tag.generation,
            period_secs = self.config.detail_period.as_secs(),
            "Starting detail refresh"
        );

        let mut issued = 0u64;
        self.detail = Some(PeriodicTask::spawn(
            "detail",
            self.config.detail_period,
            move |live| {
                issued += 1;
                let tag = DetailTag {
                    seq: issued,
                    ..tag.clone()
                };
                let source = Arc::clone(&source);
                let events = events.clone();
                async move {
                    let started = Instant::now();
                    let result = source.fetch_one(&tag.symbol).await;
                    telemetry::record_latency(LatencyMetric::DetailFetch, started.elapsed());

                    deliver(&events, &live, TickEvent::Detail { tag, result }).await;
                }
            },
        ));
    }

    /// Cancel both tasks; nothing is delivered afterwards
    pub fn stop(&mut self) {
        if let Some(task) = self.broad.take() {
            task.cancel();
        }
        if let Some(task) = self.detail.take() {
            task.cancel();
        }
        tracing::info!("Polling stopped");
    }

    pub fn is_running(&self) -> bool {
        self.broad.as_ref().is_some_and(PeriodicTask::is_live)
            || self.detail.as_ref().is_some_and(PeriodicTask::is_live)
    }
}
