//! CLI interface for crypto-alert
//!
//! Provides subcommands for:
//! - `watch`: Live monitor with chart series and price alerts
//! - `quote`: One-shot price table for tracked coins
//! - `config`: Show effective configuration

mod quote;
mod watch;

pub use quote::QuoteArgs;
pub use watch::{parse_command, render_status, UserCommand, WatchArgs};

use clap::{Parser, Subcommand};

use crate::quote::Symbol;

#[derive(Parser, Debug)]
#[command(name = "crypto-alert")]
#[command(about = "Live crypto price monitor with threshold alerts")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the live monitor
    Watch(WatchArgs),
    /// Print current prices once
    Quote(QuoteArgs),
    /// Show effective configuration
    Config,
}

/// Normalise a typed coin id; service ids are lower-case
pub fn parse_symbol(input: &str) -> Result<Symbol, String> {
    let id = input.trim();
    if id.is_empty() {
        return Err("coin id must not be empty".to_string());
    }
    Ok(Symbol::new(id.to_lowercase()))
}
