//! Quote retrieval module
//!
//! Fetches current USD prices and 24h statistics from an external price service

mod coingecko;
mod types;

pub use coingecko::{CoinGeckoClient, CoinGeckoConfig, COINGECKO_API_URL};
pub use types::{Quote, QuoteError, Symbol};

use async_trait::async_trait;
use std::collections::HashMap;

/// Trait for quote source implementations
///
/// Pure request/response: no retries, no caching.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Fetch the full quote (price, 24h change, high/low) for one symbol
    async fn fetch_one(&self, symbol: &Symbol) -> Result<Quote, QuoteError>;

    /// Fetch price and 24h change for many symbols in one batched call
    ///
    /// Symbols the service does not know are absent from the result.
    async fn fetch_many(&self, symbols: &[Symbol]) -> Result<HashMap<Symbol, Quote>, QuoteError>;
}
