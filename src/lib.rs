//! crypto-alert: live crypto price monitor with threshold alerts
//!
//! This library provides the core components for:
//! - Spot quotes from the CoinGecko public API
//! - Two independent polling cadences (broad and detail refresh)
//! - A bounded, change-filtered chart series per selected coin
//! - One-shot upper/lower threshold alerts with pluggable delivery
//! - A session state machine that publishes immutable snapshots
//! - Structured logging and optional Prometheus metrics

pub mod alert;
pub mod cli;
pub mod config;
pub mod error;
pub mod monitor;
pub mod quote;
pub mod scheduler;
pub mod series;
pub mod session;
pub mod telemetry;

pub use error::MonitorError;
