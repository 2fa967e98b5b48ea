//! Shared fixtures: a scripted quote source and a recording notifier

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

use crypto_alert::alert::{AlertChannel, Notifier};
use crypto_alert::config::TrackedCoin;
use crypto_alert::monitor::MonitorHandle;
use crypto_alert::quote::{Quote, QuoteError, QuoteSource, Symbol};
use crypto_alert::scheduler::SchedulerConfig;
use crypto_alert::series::SeriesConfig;
use crypto_alert::session::{MonitorSession, SessionState};

type DetailResult = Result<Quote, QuoteError>;
type BroadResult = Result<HashMap<Symbol, Quote>, QuoteError>;

enum Step<T> {
    Reply(T),
    Gate(oneshot::Receiver<T>),
}

impl<T> Step<T> {
    async fn resolve(self) -> T {
        match self {
            Step::Reply(result) => result,
            Step::Gate(rx) => match rx.await {
                Ok(result) => result,
                Err(_) => std::future::pending().await,
            },
        }
    }
}

/// Quote source that replays queued responses
///
/// Once a queue is exhausted the fetch never completes, so later ticks
/// have no effect on the session.
#[derive(Default)]
pub struct ScriptedSource {
    detail: Mutex<HashMap<Symbol, VecDeque<Step<DetailResult>>>>,
    broad: Mutex<VecDeque<Step<BroadResult>>>,
    calls: Mutex<Vec<Symbol>>,
    clock: Mutex<i64>,
}

impl ScriptedSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, symbol: &str, step: Step<DetailResult>) {
        self.detail
            .lock()
            .unwrap()
            .entry(Symbol::new(symbol))
            .or_default()
            .push_back(step);
    }

    /// Next observation time, 15s after the previous one
    pub fn next_time(&self) -> DateTime<Utc> {
        let mut clock = self.clock.lock().unwrap();
        *clock += 15;
        base_time() + ChronoDuration::seconds(*clock)
    }

    /// Queue one successful detail quote per price
    pub fn push_prices(&self, symbol: &str, prices: &[Decimal]) {
        for price in prices {
            let quote = Quote::new(symbol, *price).with_observed_at(self.next_time());
            self.push(symbol, Step::Reply(Ok(quote)));
        }
    }

    pub fn push_detail(&self, symbol: &str, result: DetailResult) {
        self.push(symbol, Step::Reply(result));
    }

    /// Queue a detail fetch that completes only when the sender is used
    pub fn gate_detail(&self, symbol: &str) -> oneshot::Sender<DetailResult> {
        let (tx, rx) = oneshot::channel();
        self.push(symbol, Step::Gate(rx));
        tx
    }

    pub fn push_broad(&self, result: BroadResult) {
        self.broad.lock().unwrap().push_back(Step::Reply(result));
    }

    /// Queue a broad fetch that completes only when the sender is used
    pub fn gate_broad(&self) -> oneshot::Sender<BroadResult> {
        let (tx, rx) = oneshot::channel();
        self.broad.lock().unwrap().push_back(Step::Gate(rx));
        tx
    }

    pub fn detail_calls(&self, symbol: &str) -> usize {
        let symbol = Symbol::new(symbol);
        self.calls.lock().unwrap().iter().filter(|s| **s == symbol).count()
    }

    /// Yield until a detail fetch for `symbol` has been issued
    pub async fn wait_for_detail_call(&self, symbol: &str) {
        for _ in 0..1_000 {
            if self.detail_calls(symbol) > 0 {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("no detail fetch issued for {}", symbol);
    }
}

#[async_trait]
impl QuoteSource for ScriptedSource {
    async fn fetch_one(&self, symbol: &Symbol) -> Result<Quote, QuoteError> {
        self.calls.lock().unwrap().push(symbol.clone());
        let step = {
            let mut detail = self.detail.lock().unwrap();
            let step = detail.get_mut(symbol).and_then(VecDeque::pop_front);
            step
        };

        match step {
            Some(step) => step.resolve().await,
            None => std::future::pending().await,
        }
    }

    async fn fetch_many(&self, _symbols: &[Symbol]) -> Result<HashMap<Symbol, Quote>, QuoteError> {
        let next = self.broad.lock().unwrap().pop_front();
        match next {
            Some(step) => step.resolve().await,
            None => std::future::pending().await,
        }
    }
}

/// Notifier that keeps every delivered message
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(AlertChannel, String)>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(AlertChannel, String)> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, channel: AlertChannel, message: &str) {
        self.sent.lock().unwrap().push((channel, message.to_string()));
    }
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

pub fn coins() -> Vec<TrackedCoin> {
    vec![
        TrackedCoin::new("bitcoin", "BTC"),
        TrackedCoin::new("ethereum", "ETH"),
        TrackedCoin::new("cardano", "ADA"),
    ]
}

pub fn session(selected: &str) -> MonitorSession {
    MonitorSession::new(coins(), Symbol::new(selected), SeriesConfig::default()).unwrap()
}

pub fn scheduler_config() -> SchedulerConfig {
    SchedulerConfig {
        broad_period: Duration::from_secs(30),
        detail_period: Duration::from_secs(15),
    }
}

/// Wait for a published snapshot matching `pred`
pub async fn wait_for(
    handle: &MonitorHandle,
    pred: impl FnMut(&Arc<SessionState>) -> bool,
) -> Arc<SessionState> {
    let mut rx = handle.subscribe();
    let state = tokio::time::timeout(Duration::from_secs(600), rx.wait_for(pred))
        .await
        .expect("timed out waiting for snapshot")
        .expect("monitor stopped");
    Arc::clone(&state)
}
