//! Configuration types for crypto-alert

use chrono::Duration as ChronoDuration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::alert::{parse_usd_limit, AlertChannel};
use crate::quote::{CoinGeckoConfig, Symbol, COINGECKO_API_URL};
use crate::scheduler::SchedulerConfig;
use crate::series::SeriesConfig;
use crate::telemetry::LogFormat;

/// Allowed range for the detail refresh period (seconds)
const DETAIL_PERIOD_RANGE: std::ops::RangeInclusive<u64> = 10..=15;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub coins: CoinsConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub series: SeriesSettings,
    #[serde(default)]
    pub quote_api: QuoteApiConfig,
    #[serde(default)]
    pub alert: Option<AlertConfig>,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// A coin in the tracked set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedCoin {
    /// Price service identifier (e.g., "bitcoin")
    pub id: Symbol,
    /// Display label (e.g., "BTC")
    pub label: String,
}

impl TrackedCoin {
    pub fn new(id: &str, label: &str) -> Self {
        Self {
            id: Symbol::new(id),
            label: label.to_string(),
        }
    }
}

/// Tracked coin set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinsConfig {
    /// Fixed set of coins refreshed by the broad tick
    #[serde(default = "default_tracked")]
    pub tracked: Vec<TrackedCoin>,

    /// Coin selected when the monitor starts
    #[serde(default = "default_coin")]
    pub default: Symbol,
}

fn default_tracked() -> Vec<TrackedCoin> {
    vec![
        TrackedCoin::new("bitcoin", "BTC"),
        TrackedCoin::new("ethereum", "ETH"),
        TrackedCoin::new("solana", "SOL"),
        TrackedCoin::new("cardano", "ADA"),
    ]
}
fn default_coin() -> Symbol {
    Symbol::new("cardano")
}

impl Default for CoinsConfig {
    fn default() -> Self {
        Self {
            tracked: default_tracked(),
            default: default_coin(),
        }
    }
}

/// Polling cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Broad multi-symbol refresh period (seconds)
    #[serde(default = "default_broad_period")]
    pub broad_period_secs: u64,

    /// Detail refresh period for the selected symbol (seconds, 10-15)
    #[serde(default = "default_detail_period")]
    pub detail_period_secs: u64,
}

fn default_broad_period() -> u64 {
    30
}
fn default_detail_period() -> u64 {
    15
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            broad_period_secs: 30,
            detail_period_secs: 15,
        }
    }
}

impl PollingConfig {
    pub fn to_scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            broad_period: Duration::from_secs(self.broad_period_secs),
            detail_period: Duration::from_secs(self.detail_period_secs),
        }
    }
}

/// Chart series limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesSettings {
    /// Exact cap on retained samples
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,

    /// Minimum price move (USD) to admit a sample
    #[serde(default = "default_price_eps")]
    pub price_eps: Decimal,

    /// Heartbeat gap (milliseconds) after which a sample is admitted regardless
    #[serde(default = "default_stale_gap_ms")]
    pub stale_gap_ms: i64,
}

fn default_max_samples() -> usize {
    200
}
fn default_price_eps() -> Decimal {
    Decimal::new(1, 2) // 0.01
}
fn default_stale_gap_ms() -> i64 {
    60_000
}

impl Default for SeriesSettings {
    fn default() -> Self {
        Self {
            max_samples: 200,
            price_eps: Decimal::new(1, 2),
            stale_gap_ms: 60_000,
        }
    }
}

impl SeriesSettings {
    pub fn to_series_config(&self) -> SeriesConfig {
        SeriesConfig {
            max_samples: self.max_samples,
            price_eps: self.price_eps,
            stale_gap: ChronoDuration::milliseconds(self.stale_gap_ms),
        }
    }
}

/// External price service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Transport timeout for a single HTTP request (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    COINGECKO_API_URL.to_string()
}
fn default_request_timeout() -> u64 {
    10
}

impl Default for QuoteApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: 10,
        }
    }
}

impl QuoteApiConfig {
    pub fn to_client_config(&self) -> CoinGeckoConfig {
        CoinGeckoConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

/// Alert rule armed at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Upper limit, e.g. "70000" or "$70,000"
    pub upper: Option<String>,
    /// Lower limit, e.g. "60000" or "$60,000"
    pub lower: Option<String>,
    #[serde(default)]
    pub channel: AlertChannel,
}

impl AlertConfig {
    pub fn upper_limit(&self) -> Option<Decimal> {
        self.upper.as_deref().and_then(parse_usd_limit)
    }

    pub fn lower_limit(&self) -> Option<Decimal> {
        self.lower.as_deref().and_then(parse_usd_limit)
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Prometheus exporter port; disabled when absent
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            metrics_port: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.coins.tracked.is_empty() {
            anyhow::bail!("coins.tracked must not be empty");
        }
        if !self.coins.tracked.iter().any(|c| c.id == self.coins.default) {
            anyhow::bail!(
                "coins.default '{}' is not in the tracked set",
                self.coins.default
            );
        }
        if self.polling.broad_period_secs == 0 {
            anyhow::bail!("polling.broad_period_secs must be positive");
        }
        if !DETAIL_PERIOD_RANGE.contains(&self.polling.detail_period_secs) {
            anyhow::bail!(
                "polling.detail_period_secs must be within {}..={}, got {}",
                DETAIL_PERIOD_RANGE.start(),
                DETAIL_PERIOD_RANGE.end(),
                self.polling.detail_period_secs
            );
        }
        if self.series.max_samples == 0 {
            anyhow::bail!("series.max_samples must be positive");
        }
        if self.series.stale_gap_ms <= 0 {
            anyhow::bail!("series.stale_gap_ms must be positive");
        }
        Ok(())
    }

    /// Tracked coin identifiers in configured order
    pub fn tracked_symbols(&self) -> Vec<Symbol> {
        self.coins.tracked.iter().map(|c| c.id.clone()).collect()
    }
}
