//! Threshold alert rule and crossing evaluation

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MonitorError;
use crate::quote::{Quote, Symbol};

/// Where a fired alert is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertChannel {
    /// Local, synchronous interrupt for the user at the terminal
    #[default]
    Browser,
    /// Routed to an external delivery collaborator
    Email,
    /// Routed to an external delivery collaborator
    Telegram,
}

impl AlertChannel {
    /// Channels that need a concrete local effect
    pub fn is_local(&self) -> bool {
        matches!(self, AlertChannel::Browser)
    }
}

impl fmt::Display for AlertChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlertChannel::Browser => "browser",
            AlertChannel::Email => "email",
            AlertChannel::Telegram => "telegram",
        };
        f.pad(name)
    }
}

impl FromStr for AlertChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "browser" => Ok(AlertChannel::Browser),
            "email" => Ok(AlertChannel::Email),
            "telegram" => Ok(AlertChannel::Telegram),
            other => Err(format!("unknown alert channel: {}", other)),
        }
    }
}

/// Which limit was crossed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrossingKind {
    /// Price reached or exceeded the upper limit
    Upper,
    /// Price reached or fell below the lower limit
    Lower,
}

/// A detected threshold crossing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossingEvent {
    pub symbol: Symbol,
    pub kind: CrossingKind,
    /// Price that triggered the crossing
    pub price: Decimal,
    /// Limit that was crossed
    pub limit: Decimal,
    pub channel: AlertChannel,
    pub detected_at: DateTime<Utc>,
}

impl CrossingEvent {
    /// Human-readable alert text using the coin's display label
    pub fn message(&self, label: &str) -> String {
        match self.kind {
            CrossingKind::Upper => format!(
                "{} crossed above upper limit ${}: now ${}",
                label, self.limit, self.price
            ),
            CrossingKind::Lower => format!(
                "{} crossed below lower limit ${}: now ${}",
                label, self.limit, self.price
            ),
        }
    }
}

/// Symbol-scoped upper/lower threshold pair
///
/// `upper > lower` holds for every rule; the check runs once in `new` and
/// the limits cannot change afterwards. A rule disarms itself the moment it
/// fires.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertRule {
    symbol: Symbol,
    upper: Decimal,
    lower: Decimal,
    channel: AlertChannel,
    armed: bool,
}

impl AlertRule {
    /// Validate limits and create an armed rule
    pub fn new(
        symbol: Symbol,
        upper: Option<Decimal>,
        lower: Option<Decimal>,
        channel: AlertChannel,
    ) -> Result<Self, MonitorError> {
        match (upper, lower) {
            (Some(u), Some(l)) if u > l => Ok(Self {
                symbol,
                upper: u,
                lower: l,
                channel,
                armed: true,
            }),
            _ => Err(MonitorError::InvalidRuleRange { upper, lower }),
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn upper(&self) -> Decimal {
        self.upper
    }

    pub fn lower(&self) -> Decimal {
        self.lower
    }

    pub fn channel(&self) -> AlertChannel {
        self.channel
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Make the rule inert while keeping its limits
    pub fn disarm(&mut self) {
        self.armed = false;
    }

    /// Check `quote` against the limits, disarming on a crossing
    pub fn evaluate(&mut self, quote: &Quote) -> Option<CrossingEvent> {
        if !self.armed || quote.symbol() != &self.symbol {
            return None;
        }

        let price = quote.price_usd();
        let (kind, limit) = if price >= self.upper {
            (CrossingKind::Upper, self.upper)
        } else if price <= self.lower {
            (CrossingKind::Lower, self.lower)
        } else {
            return None;
        };

        self.disarm();

        Some(CrossingEvent {
            symbol: self.symbol.clone(),
            kind,
            price,
            limit,
            channel: self.channel,
            detected_at: quote.observed_at(),
        })
    }
}

/// Evaluate an optional rule against a quote
pub fn evaluate(rule: Option<&mut AlertRule>, quote: &Quote) -> Option<CrossingEvent> {
    rule.and_then(|r| r.evaluate(quote))
}

/// Parse a user-entered USD limit such as `70000`, `$70000` or `$70,000.50`
pub fn parse_usd_limit(input: &str) -> Option<Decimal> {
    let cleaned: String = input
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    Decimal::from_str(&cleaned).ok()
}
