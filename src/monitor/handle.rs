//! Presentation-side handle to a running monitor

use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

use crate::alert::AlertChannel;
use crate::error::MonitorError;
use crate::quote::Symbol;
use crate::session::SessionState;

/// User-issued commands processed by the monitor loop
#[derive(Debug)]
pub enum MonitorCommand {
    Select {
        symbol: Symbol,
        reply: oneshot::Sender<Result<(), MonitorError>>,
    },
    SaveAlert {
        upper: Option<Decimal>,
        lower: Option<Decimal>,
        channel: AlertChannel,
        reply: oneshot::Sender<Result<(), MonitorError>>,
    },
    DisableAlert,
    Stop,
}

/// Cloneable handle for issuing commands and observing snapshots
#[derive(Clone)]
pub struct MonitorHandle {
    commands: mpsc::Sender<MonitorCommand>,
    snapshots: watch::Receiver<Arc<SessionState>>,
}

impl MonitorHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<MonitorCommand>,
        snapshots: watch::Receiver<Arc<SessionState>>,
    ) -> Self {
        Self {
            commands,
            snapshots,
        }
    }

    async fn request(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<(), MonitorError>>) -> MonitorCommand,
    ) -> Result<(), MonitorError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| MonitorError::Stopped)?;
        rx.await.map_err(|_| MonitorError::Stopped)?
    }

    /// Switch the selected symbol
    pub async fn select(&self, symbol: Symbol) -> Result<(), MonitorError> {
        self.request(|reply| MonitorCommand::Select { symbol, reply })
            .await
    }

    /// Arm a new alert rule for the selected symbol
    pub async fn save_alert(
        &self,
        upper: Option<Decimal>,
        lower: Option<Decimal>,
        channel: AlertChannel,
    ) -> Result<(), MonitorError> {
        self.request(|reply| MonitorCommand::SaveAlert {
            upper,
            lower,
            channel,
            reply,
        })
        .await
    }

    /// Disarm the current rule, keeping its limits
    pub async fn disable_alert(&self) -> Result<(), MonitorError> {
        self.commands
            .send(MonitorCommand::DisableAlert)
            .await
            .map_err(|_| MonitorError::Stopped)
    }

    /// Stop polling and end the monitor loop
    pub async fn stop(&self) {
        let _ = self.commands.send(MonitorCommand::Stop).await;
    }

    /// Receiver that wakes on every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Arc<SessionState>> {
        self.snapshots.clone()
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Arc<SessionState> {
        Arc::clone(&self.snapshots.borrow())
    }
}
