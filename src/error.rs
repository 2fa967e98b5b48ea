//! Engine error taxonomy

use crate::quote::{QuoteError, Symbol};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors surfaced by the monitoring engine
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MonitorError {
    /// Alert limits missing or not ordered `upper > lower`
    #[error("Invalid alert range: upper={upper:?} lower={lower:?}")]
    InvalidRuleRange {
        upper: Option<Decimal>,
        lower: Option<Decimal>,
    },
    /// Symbol is not part of the tracked set
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),
    /// Fetch result arrived for a selection that is no longer current
    #[error("Stale result for {symbol} (generation {issued}, current {current})")]
    StaleResult {
        symbol: Symbol,
        issued: u64,
        current: u64,
    },
    /// An older fetch of the same refresh finished after a newer one was applied
    #[error("Out-of-order {refresh} result (seq {seq}, applied {applied})")]
    OutOfOrder {
        refresh: &'static str,
        seq: u64,
        applied: u64,
    },
    /// Quote retrieval failed
    #[error(transparent)]
    Quote(#[from] QuoteError),
    /// The monitor loop is no longer running
    #[error("Monitor stopped")]
    Stopped,
}

impl MonitorError {
    /// Internal errors are dropped silently and never shown to the user
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            MonitorError::StaleResult { .. } | MonitorError::OutOfOrder { .. }
        )
    }
}
