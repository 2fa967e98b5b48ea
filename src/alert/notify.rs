//! Notification channels for fired alerts
//!
//! Delivery is fire-and-forget: the engine hands a message to a channel and
//! never tracks whether it arrived.

use std::io::Write;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use super::AlertChannel;

/// Trait for notification sinks
pub trait Notifier: Send + Sync {
    /// Deliver `message` on `channel` without waiting for an outcome
    fn notify(&self, channel: AlertChannel, message: &str);
}

/// Synchronous local interrupt written to the user's terminal
pub struct LocalNotifier {
    out: Mutex<Box<dyn Write + Send>>,
}

impl LocalNotifier {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Write alerts to stderr, away from the status line on stdout
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }
}

impl Notifier for LocalNotifier {
    fn notify(&self, channel: AlertChannel, message: &str) {
        let Ok(mut out) = self.out.lock() else {
            tracing::error!("Local notifier writer poisoned");
            return;
        };

        // BEL rings the terminal, the banner line stands out from status output
        let result = writeln!(out, "\x07*** PRICE ALERT *** {}", message).and_then(|_| out.flush());
        if let Err(e) = result {
            tracing::warn!(error = %e, %channel, "Failed to write local alert");
        }
    }
}

/// A notification handed to an external delivery collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundNotification {
    pub channel: AlertChannel,
    pub message: String,
}

/// Forwards Email/Telegram notifications to an externally owned receiver
#[derive(Default)]
pub struct ExternalDelivery {
    tx: Option<mpsc::Sender<OutboundNotification>>,
}

impl ExternalDelivery {
    /// Delivery with no collaborator attached; notifications are logged and dropped
    pub fn detached() -> Self {
        Self { tx: None }
    }

    /// Create a delivery sink and the receiver an external worker should drain
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<OutboundNotification>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx: Some(tx) }, rx)
    }
}

impl Notifier for ExternalDelivery {
    fn notify(&self, channel: AlertChannel, message: &str) {
        let Some(tx) = &self.tx else {
            tracing::warn!(%channel, text = message, "No external delivery attached, alert dropped");
            return;
        };

        let outbound = OutboundNotification {
            channel,
            message: message.to_string(),
        };

        if let Err(e) = tx.try_send(outbound) {
            tracing::warn!(%channel, error = %e, "External delivery unavailable, alert dropped");
        }
    }
}

/// Dispatches each alert to the sink responsible for its channel
#[derive(Clone)]
pub struct NotificationRouter {
    local: Arc<dyn Notifier>,
    external: Arc<dyn Notifier>,
}

impl NotificationRouter {
    pub fn new(local: Arc<dyn Notifier>, external: Arc<dyn Notifier>) -> Self {
        Self { local, external }
    }

    /// Terminal alerts for Browser, detached external delivery for the rest
    pub fn with_defaults() -> Self {
        Self::new(
            Arc::new(LocalNotifier::stderr()),
            Arc::new(ExternalDelivery::detached()),
        )
    }
}

impl Notifier for NotificationRouter {
    fn notify(&self, channel: AlertChannel, message: &str) {
        match channel {
            AlertChannel::Browser => self.local.notify(channel, message),
            AlertChannel::Email | AlertChannel::Telegram => self.external.notify(channel, message),
        }
    }
}
