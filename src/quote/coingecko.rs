//! CoinGecko API client for price quotes
//!
//! Batch refreshes use `/simple/price` (price and 24h change for many coins),
//! detail refreshes use `/coins/markets` (adds 24h high/low for one coin).
//! The quote currency is always USD.

use super::{Quote, QuoteError, QuoteSource, Symbol};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// CoinGecko public API base URL
pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// Quote currency
const VS_CURRENCY: &str = "usd";

/// Configuration for the CoinGecko client
#[derive(Debug, Clone)]
pub struct CoinGeckoConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Transport timeout for a single request
    pub timeout: Duration,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            base_url: COINGECKO_API_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Client for the CoinGecko price API
pub struct CoinGeckoClient {
    config: CoinGeckoConfig,
    client: Client,
}

impl CoinGeckoClient {
    /// Create a new client with default configuration
    pub fn new() -> Self {
        Self::with_config(CoinGeckoConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: CoinGeckoConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// GET a path and return the body of a successful response
    async fn get_body(&self, path: &str, query: &[(&str, String)]) -> Result<String, QuoteError> {
        let url = format!("{}{}", self.config.base_url, path);

        tracing::debug!(url = %url, "Requesting CoinGecko");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| QuoteError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(QuoteError::Network(format!("{} - {}", status, body)));
        }

        response
            .text()
            .await
            .map_err(|e| QuoteError::Network(e.to_string()))
    }
}

impl Default for CoinGeckoClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuoteSource for CoinGeckoClient {
    async fn fetch_one(&self, symbol: &Symbol) -> Result<Quote, QuoteError> {
        let body = self
            .get_body(
                "/coins/markets",
                &[
                    ("vs_currency", VS_CURRENCY.to_string()),
                    ("ids", symbol.to_string()),
                ],
            )
            .await?;

        parse_market_quote(symbol, &body)
    }

    async fn fetch_many(&self, symbols: &[Symbol]) -> Result<HashMap<Symbol, Quote>, QuoteError> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }

        let ids = symbols
            .iter()
            .map(Symbol::as_str)
            .collect::<Vec<_>>()
            .join(",");

        let body = self
            .get_body(
                "/simple/price",
                &[
                    ("ids", ids),
                    ("vs_currencies", VS_CURRENCY.to_string()),
                    ("include_24hr_change", "true".to_string()),
                    ("include_last_updated_at", "true".to_string()),
                ],
            )
            .await?;

        parse_simple_prices(&body)
    }
}

/// Entry of a `/simple/price` response, keyed by coin id
#[derive(Debug, Deserialize)]
struct SimplePrice {
    usd: Option<Decimal>,
    usd_24h_change: Option<Decimal>,
    last_updated_at: Option<i64>,
}

/// Entry of a `/coins/markets` response
#[derive(Debug, Deserialize)]
struct MarketEntry {
    id: String,
    current_price: Option<Decimal>,
    price_change_percentage_24h: Option<Decimal>,
    high_24h: Option<Decimal>,
    low_24h: Option<Decimal>,
    last_updated: Option<String>,
}

/// Parse a `/simple/price` body into quotes keyed by symbol
fn parse_simple_prices(body: &str) -> Result<HashMap<Symbol, Quote>, QuoteError> {
    let entries: HashMap<String, SimplePrice> = serde_json::from_str(body)
        .map_err(|e| QuoteError::MalformedResponse(format!("simple/price: {}", e)))?;

    let received_at = Utc::now();
    let mut quotes = HashMap::with_capacity(entries.len());

    for (id, entry) in entries {
        let symbol = Symbol::new(id);
        let price = entry.usd.ok_or_else(|| {
            QuoteError::MalformedResponse(format!("simple/price: missing usd for {}", symbol))
        })?;
        check_price(&symbol, price)?;

        let observed_at = entry
            .last_updated_at
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or(received_at);

        let quote = Quote::new(symbol.clone(), price)
            .with_change(entry.usd_24h_change)
            .with_observed_at(observed_at);
        quotes.insert(symbol, quote);
    }

    Ok(quotes)
}

/// Parse a `/coins/markets` body into the quote for `symbol`
fn parse_market_quote(symbol: &Symbol, body: &str) -> Result<Quote, QuoteError> {
    let entries: Vec<MarketEntry> = serde_json::from_str(body)
        .map_err(|e| QuoteError::MalformedResponse(format!("coins/markets: {}", e)))?;

    let entry = entries
        .into_iter()
        .find(|e| e.id == symbol.as_str())
        .ok_or_else(|| {
            QuoteError::MalformedResponse(format!("coins/markets: no entry for {}", symbol))
        })?;

    let price = entry.current_price.ok_or_else(|| {
        QuoteError::MalformedResponse(format!("coins/markets: missing current_price for {}", symbol))
    })?;
    check_price(symbol, price)?;

    let observed_at = entry
        .last_updated
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    Ok(Quote::new(symbol.clone(), price)
        .with_change(entry.price_change_percentage_24h)
        .with_range(entry.high_24h, entry.low_24h)
        .with_observed_at(observed_at))
}

fn check_price(symbol: &Symbol, price: Decimal) -> Result<(), QuoteError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(QuoteError::MalformedResponse(format!(
            "negative price {} for {}",
            price, symbol
        )));
    }
    Ok(())
}
