//! Watch command implementation

use clap::Args;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::parse_symbol;
use crate::alert::{parse_usd_limit, AlertChannel, NotificationRouter};
use crate::config::Config;
use crate::monitor::{Monitor, MonitorHandle};
use crate::quote::{CoinGeckoClient, Symbol};
use crate::session::{AlertStatus, MonitorSession, SessionPhase, SessionState};

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Coin id to select at start (overrides config)
    #[arg(long, value_parser = parse_symbol)]
    pub coin: Option<Symbol>,

    /// Upper alert limit in USD, e.g. 70000 or "$70,000"
    #[arg(long)]
    pub upper: Option<String>,

    /// Lower alert limit in USD
    #[arg(long)]
    pub lower: Option<String>,

    /// Alert channel: browser, email or telegram
    #[arg(long)]
    pub channel: Option<AlertChannel>,

    /// Do not read commands from stdin
    #[arg(long)]
    pub no_input: bool,
}

/// A line command typed while watching
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    Select(Symbol),
    Alert {
        upper: Option<Decimal>,
        lower: Option<Decimal>,
        channel: AlertChannel,
    },
    Disable,
    Help,
    Quit,
}

const HELP: &str = "commands: select <id> | alert <upper> <lower> [browser|email|telegram] | disable | quit";

/// Parse one stdin line into a command
pub fn parse_command(line: &str) -> Result<UserCommand, String> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Err(HELP.to_string());
    };

    match verb.to_lowercase().as_str() {
        "select" | "s" => {
            let id = parts.next().ok_or_else(|| "usage: select <id>".to_string())?;
            parse_symbol(id).map(UserCommand::Select)
        }
        "alert" | "a" => {
            let upper = parts.next().and_then(parse_usd_limit);
            let lower = parts.next().and_then(parse_usd_limit);
            let channel = match parts.next() {
                Some(c) => c.parse()?,
                None => AlertChannel::default(),
            };
            Ok(UserCommand::Alert {
                upper,
                lower,
                channel,
            })
        }
        "disable" | "d" => Ok(UserCommand::Disable),
        "help" | "h" | "?" => Ok(UserCommand::Help),
        "quit" | "q" | "exit" => Ok(UserCommand::Quit),
        other => Err(format!("unknown command '{}'; {}", other, HELP)),
    }
}

fn usd(value: Decimal) -> String {
    format!("${:.2}", value)
}

/// One-line status rendering of a snapshot
pub fn render_status(state: &SessionState) -> String {
    let label = state.selected_label();
    let mut line = format!("{}/USD ", label);

    match (state.phase, state.current_price()) {
        (SessionPhase::Idle, _) => line.push_str("idle"),
        (SessionPhase::Loading, _) => line.push_str("loading..."),
        (SessionPhase::Error, _) => {
            let reason = state
                .last_error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_default();
            line.push_str(&format!("unavailable ({})", reason));
        }
        (SessionPhase::Ready, Some(price)) => {
            line.push_str(&usd(price));
            if let Some(change) = state.change_24h() {
                line.push_str(&format!(" {} {:.2}% (24h)", state.trend().arrow(), change.abs()));
            }
            if let Some((high, low)) = state.range_24h() {
                line.push_str(&format!(" H {} L {}", usd(high), usd(low)));
            }
            if let Some(at) = state.last_updated() {
                line.push_str(&format!(" | updated {}", at.format("%Y-%m-%d %H:%M:%S")));
            }
            if state.last_error.is_some() {
                line.push_str(" (stale)");
            }
        }
        (SessionPhase::Ready, None) => line.push_str("—"),
    }

    line.push_str(&format!(" | chart {} pts", state.series.len()));

    match (state.alert_status(), &state.rule) {
        (AlertStatus::Armed, Some(rule)) => line.push_str(&format!(
            " | alert armed {}-{} via {}",
            usd(rule.lower()),
            usd(rule.upper()),
            rule.channel()
        )),
        (AlertStatus::Disarmed, Some(rule)) => line.push_str(&format!(
            " | alert off {}-{}",
            usd(rule.lower()),
            usd(rule.upper())
        )),
        _ => line.push_str(" | no active alerts"),
    }

    let others: Vec<String> = state
        .coins
        .iter()
        .filter(|c| c.id != state.selected)
        .map(|c| match state.price_of(&c.id) {
            Some(p) => format!("{} {}", c.label, usd(p)),
            None => format!("{} —", c.label),
        })
        .collect();
    if !others.is_empty() {
        line.push_str(" | ");
        line.push_str(&others.join("  "));
    }

    line
}

impl WatchArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let selected = self
            .coin
            .clone()
            .unwrap_or_else(|| config.coins.default.clone());

        let mut session = MonitorSession::new(
            config.coins.tracked.clone(),
            selected,
            config.series.to_series_config(),
        )?;

        let configured = config.alert.as_ref();
        let upper = match &self.upper {
            Some(u) => parse_usd_limit(u),
            None => configured.and_then(|a| a.upper_limit()),
        };
        let lower = match &self.lower {
            Some(l) => parse_usd_limit(l),
            None => configured.and_then(|a| a.lower_limit()),
        };
        let channel = self
            .channel
            .or(configured.map(|a| a.channel))
            .unwrap_or_default();
        if upper.is_some() || lower.is_some() {
            session.save_alert_rule(upper, lower, channel)?;
        }

        let source = Arc::new(CoinGeckoClient::with_config(config.quote_api.to_client_config()));
        let monitor = Monitor::new(
            session,
            source,
            config.polling.to_scheduler_config(),
            Arc::new(NotificationRouter::with_defaults()),
        );
        let (handle, join) = monitor.spawn();

        let result = self.interact(&handle).await;

        handle.stop().await;
        join.await?;
        result
    }

    /// Render snapshots and apply stdin commands until quit or Ctrl-C
    async fn interact(&self, handle: &MonitorHandle) -> anyhow::Result<()> {
        let mut snapshots = handle.subscribe();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut input_open = !self.no_input;

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        println!("{}", render_status(&handle.snapshot()));
        if input_open {
            println!("{}", HELP);
        }

        loop {
            tokio::select! {
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = snapshots.borrow_and_update().clone();
                    println!("{}", render_status(&state));
                }
                line = lines.next_line(), if input_open => {
                    match line? {
                        Some(line) if line.trim().is_empty() => {}
                        Some(line) => {
                            if !self.apply(handle, &line).await {
                                break;
                            }
                        }
                        None => input_open = false,
                    }
                }
                _ = &mut ctrl_c => {
                    tracing::info!("Interrupted");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Apply one line command; returns false to quit
    async fn apply(&self, handle: &MonitorHandle, line: &str) -> bool {
        let outcome = match parse_command(line) {
            Ok(UserCommand::Quit) => return false,
            Ok(UserCommand::Help) => {
                println!("{}", HELP);
                return true;
            }
            Ok(UserCommand::Select(symbol)) => handle.select(symbol).await,
            Ok(UserCommand::Alert {
                upper,
                lower,
                channel,
            }) => handle.save_alert(upper, lower, channel).await,
            Ok(UserCommand::Disable) => handle.disable_alert().await,
            Err(msg) => {
                println!("{}", msg);
                return true;
            }
        };

        if let Err(e) = outcome {
            println!("error: {}", e);
        }
        true
    }
}
