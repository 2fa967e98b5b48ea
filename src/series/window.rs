//! Bounded chart series for one symbol

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::quote::{Quote, Symbol};

/// A reduced quote retained for charting
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, price: Decimal) -> Self {
        Self { timestamp, price }
    }
}

impl From<&Quote> for Sample {
    fn from(quote: &Quote) -> Self {
        Self::new(quote.observed_at(), quote.price_usd())
    }
}

/// Configuration for the series window
#[derive(Debug, Clone)]
pub struct SeriesConfig {
    /// Exact cap on retained samples (default: 200)
    pub max_samples: usize,
    /// Minimum price move to admit a new sample (default: 0.01)
    pub price_eps: Decimal,
    /// Maximum silence before a heartbeat sample is forced (default: 60s)
    pub stale_gap: Duration,
}

impl Default for SeriesConfig {
    fn default() -> Self {
        Self {
            max_samples: 200,
            price_eps: dec!(0.01),
            stale_gap: Duration::milliseconds(60_000),
        }
    }
}

/// Time-ordered, bounded sequence of samples for exactly one symbol
///
/// Near-identical consecutive polls are dropped by an admission filter,
/// while a sample is still admitted at least once per stale gap. Once full,
/// the oldest samples are evicted first.
#[derive(Debug, Clone)]
pub struct SeriesWindow {
    symbol: Symbol,
    config: SeriesConfig,
    samples: VecDeque<Sample>,
}

impl SeriesWindow {
    /// Create an empty window for `symbol`
    pub fn new(symbol: Symbol, config: SeriesConfig) -> Self {
        let capacity = config.max_samples;
        Self {
            symbol,
            config,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// Create a window with default configuration
    pub fn with_defaults(symbol: Symbol) -> Self {
        Self::new(symbol, SeriesConfig::default())
    }

    /// Append a sample if it passes the admission filter
    ///
    /// Returns whether the sample was retained. Rejected samples are dropped
    /// silently.
    pub fn append(&mut self, sample: Sample) -> bool {
        if !self.admits(&sample) {
            tracing::trace!(
                symbol = %self.symbol,
                price = %sample.price,
                "Sample dropped by admission filter"
            );
            return false;
        }

        self.samples.push_back(sample);
        while self.samples.len() > self.config.max_samples {
            self.samples.pop_front();
        }

        true
    }

    /// Admission filter relative to the last retained sample
    fn admits(&self, sample: &Sample) -> bool {
        let Some(last) = self.samples.back() else {
            return true;
        };

        // Timestamps must stay strictly increasing
        if sample.timestamp <= last.timestamp {
            return false;
        }

        let moved = (sample.price - last.price).abs() > self.config.price_eps;
        let stale = sample.timestamp - last.timestamp > self.config.stale_gap;

        moved || stale
    }

    /// Drop all samples
    pub fn reset(&mut self) {
        self.samples.clear();
    }

    /// Copy of the current ordered samples
    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.config.max_samples
    }
}
