//! Immutable session snapshot and derived views

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::alert::AlertRule;
use crate::config::TrackedCoin;
use crate::quote::{Quote, QuoteError, Symbol};
use crate::series::{Sample, SeriesWindow};

/// Lifecycle phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
    /// Polling has not started
    Idle,
    /// Waiting for the first detail quote of the selected symbol
    Loading,
    /// At least one detail quote has been applied for the selected symbol
    Ready,
    /// The first detail fetch for the selected symbol failed
    Error,
}

/// Identifies which selection an outstanding detail fetch belongs to
///
/// `seq` is assigned by the scheduler when the fetch is issued and grows
/// with every firing of the same detail task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DetailTag {
    pub symbol: Symbol,
    pub generation: u64,
    pub seq: u64,
}

/// Direction of the 24h change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    pub fn arrow(&self) -> &'static str {
        match self {
            Trend::Up => "▲",
            Trend::Down => "▼",
            Trend::Flat => "•",
        }
    }
}

/// Alert status shown next to the price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlertStatus {
    /// No rule has been saved
    None,
    /// Rule is live and will fire on the next crossing
    Armed,
    /// Rule fired or was disabled; limits are kept for display
    Disarmed,
}

/// The single source of truth handed to the presentation layer
///
/// A new value is built for every transition; readers holding an older
/// `Arc` keep a consistent view.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub selected: Symbol,
    pub generation: u64,
    pub latest_quote: Option<Quote>,
    pub all_symbols: BTreeMap<Symbol, Option<Quote>>,
    pub series: SeriesWindow,
    pub rule: Option<AlertRule>,
    pub last_error: Option<QuoteError>,
    pub coins: Arc<[TrackedCoin]>,
}

impl SessionState {
    /// Tag for detail fetches issued for the current selection
    pub fn detail_tag(&self) -> DetailTag {
        DetailTag {
            symbol: self.selected.clone(),
            generation: self.generation,
            seq: 0,
        }
    }

    pub fn current_price(&self) -> Option<Decimal> {
        self.latest_quote.as_ref().map(|q| q.price_usd())
    }

    pub fn change_24h(&self) -> Option<Decimal> {
        self.latest_quote.as_ref().and_then(|q| q.change_24h_pct())
    }

    /// 24h (high, low) of the selected symbol
    pub fn range_24h(&self) -> Option<(Decimal, Decimal)> {
        let quote = self.latest_quote.as_ref()?;
        Some((quote.high_24h()?, quote.low_24h()?))
    }

    pub fn trend(&self) -> Trend {
        match self.change_24h() {
            Some(c) if c > Decimal::ZERO => Trend::Up,
            Some(c) if c < Decimal::ZERO => Trend::Down,
            _ => Trend::Flat,
        }
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.latest_quote.as_ref().map(|q| q.observed_at())
    }

    /// Ordered chart samples
    pub fn chart(&self) -> Vec<Sample> {
        self.series.snapshot()
    }

    pub fn alert_status(&self) -> AlertStatus {
        match &self.rule {
            None => AlertStatus::None,
            Some(rule) if rule.is_armed() => AlertStatus::Armed,
            Some(_) => AlertStatus::Disarmed,
        }
    }

    /// Display label for a symbol, falling back to the upper-cased id
    pub fn label_for(&self, symbol: &Symbol) -> String {
        self.coins
            .iter()
            .find(|c| &c.id == symbol)
            .map(|c| c.label.clone())
            .unwrap_or_else(|| symbol.as_str().to_uppercase())
    }

    pub fn selected_label(&self) -> String {
        self.label_for(&self.selected)
    }

    /// Broad-refresh price for any tracked symbol
    pub fn price_of(&self, symbol: &Symbol) -> Option<Decimal> {
        self.all_symbols
            .get(symbol)
            .and_then(|q| q.as_ref())
            .map(|q| q.price_usd())
    }
}
