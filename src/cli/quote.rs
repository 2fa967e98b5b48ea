//! Quote command implementation

use clap::Args;

use super::parse_symbol;
use crate::config::Config;
use crate::quote::{CoinGeckoClient, QuoteSource, Symbol};

#[derive(Args, Debug)]
pub struct QuoteArgs {
    /// Coin ids to fetch (defaults to the tracked set)
    #[arg(value_parser = parse_symbol)]
    pub ids: Vec<Symbol>,
}

impl QuoteArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let symbols: Vec<Symbol> = if self.ids.is_empty() {
            config.tracked_symbols()
        } else {
            self.ids.clone()
        };

        let client = CoinGeckoClient::with_config(config.quote_api.to_client_config());
        let quotes = client.fetch_many(&symbols).await?;

        for symbol in &symbols {
            let label = config
                .coins
                .tracked
                .iter()
                .find(|c| &c.id == symbol)
                .map(|c| c.label.clone())
                .unwrap_or_else(|| symbol.as_str().to_uppercase());

            match quotes.get(symbol) {
                Some(q) => {
                    let change = q
                        .change_24h_pct()
                        .map(|c| format!("{:+.2}%", c))
                        .unwrap_or_else(|| "—".to_string());
                    println!("{:<6} {:<12} ${:>14.2} {:>9}", label, symbol, q.price_usd(), change);
                }
                None => println!("{:<6} {:<12} {:>15}", label, symbol, "unavailable"),
            }
        }

        Ok(())
    }
}
