//! Quote types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Coin identifier from the tracked set (e.g., "bitcoin")
///
/// Opaque: kept exactly as given and compared by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for Symbol {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

/// A price observation for one symbol, quoted in USD
///
/// Fields are fixed once the builder chain finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    symbol: Symbol,
    price_usd: Decimal,
    /// 24h price change in percent
    change_24h_pct: Option<Decimal>,
    /// Detail fetch only
    high_24h: Option<Decimal>,
    /// Detail fetch only
    low_24h: Option<Decimal>,
    /// When the service observed the price (or when it was received, if unknown)
    observed_at: DateTime<Utc>,
}

impl Quote {
    /// Create a quote observed now with no 24h statistics
    pub fn new(symbol: impl Into<Symbol>, price_usd: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            price_usd,
            change_24h_pct: None,
            high_24h: None,
            low_24h: None,
            observed_at: Utc::now(),
        }
    }

    pub fn with_observed_at(mut self, at: DateTime<Utc>) -> Self {
        self.observed_at = at;
        self
    }

    pub fn with_change(mut self, pct: impl Into<Option<Decimal>>) -> Self {
        self.change_24h_pct = pct.into();
        self
    }

    pub fn with_range(
        mut self,
        high: impl Into<Option<Decimal>>,
        low: impl Into<Option<Decimal>>,
    ) -> Self {
        self.high_24h = high.into();
        self.low_24h = low.into();
        self
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn price_usd(&self) -> Decimal {
        self.price_usd
    }

    pub fn change_24h_pct(&self) -> Option<Decimal> {
        self.change_24h_pct
    }

    pub fn high_24h(&self) -> Option<Decimal> {
        self.high_24h
    }

    pub fn low_24h(&self) -> Option<Decimal> {
        self.low_24h
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }
}

/// Quote retrieval errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QuoteError {
    /// Transport failure or non-success status
    #[error("Network error: {0}")]
    Network(String),
    /// Response did not carry the expected fields
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}
