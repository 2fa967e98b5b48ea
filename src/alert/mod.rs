//! Price alert module
//!
//! Threshold rules evaluated against each detail quote, and the channels
//! fired alerts are handed to

mod notify;
mod rule;

pub use notify::{ExternalDelivery, LocalNotifier, NotificationRouter, Notifier, OutboundNotification};
pub use rule::{evaluate, parse_usd_limit, AlertChannel, AlertRule, CrossingEvent, CrossingKind};
