//! Monitor event loop
//!
//! One task owns the session and applies scheduler results and user
//! commands strictly in arrival order. After each transition the new
//! snapshot is published to observers.

use rust_decimal::prelude::ToPrimitive;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::handle::{MonitorCommand, MonitorHandle};
use crate::alert::{CrossingEvent, Notifier};
use crate::quote::QuoteSource;
use crate::scheduler::{PollingScheduler, SchedulerConfig, TickEvent};
use crate::session::{MonitorSession, SessionState};
use crate::telemetry::{self, CounterMetric, GaugeMetric};

/// Wires a session to its scheduler and notification channels
pub struct Monitor {
    session: MonitorSession,
    scheduler: PollingScheduler,
    ticks: mpsc::Receiver<TickEvent>,
    notifier: Arc<dyn Notifier>,
    snapshots: watch::Sender<Arc<SessionState>>,
}

impl Monitor {
    /// Create a monitor; polling starts when it is spawned
    pub fn new(
        session: MonitorSession,
        source: Arc<dyn QuoteSource>,
        config: SchedulerConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (scheduler, ticks) = PollingScheduler::new(source, session.tracked_symbols(), config);
        let (snapshots, _) = watch::channel(session.snapshot());

        Self {
            session,
            scheduler,
            ticks,
            notifier,
            snapshots,
        }
    }

    /// Start polling on a background task and return the handle to it
    pub fn spawn(self) -> (MonitorHandle, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::channel(32);
        let handle = MonitorHandle::new(command_tx, self.snapshots.subscribe());
        let join = tokio::spawn(self.run(command_rx));
        (handle, join)
    }

    async fn run(mut self, mut commands: mpsc::Receiver<MonitorCommand>) {
        self.session.activate();
        self.scheduler.start(self.session.detail_tag());
        self.publish();

        loop {
            tokio::select! {
                // Commands first, so a switch lands before queued ticks
                biased;

                command = commands.recv() => match command {
                    Some(MonitorCommand::Stop) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(event) = self.ticks.recv() => self.handle_tick(event),
            }
        }

        self.scheduler.stop();
        tracing::info!("Monitor stopped");
    }

    fn handle_command(&mut self, command: MonitorCommand) {
        match command {
            MonitorCommand::Select { symbol, reply } => {
                let result = self.session.select_symbol(symbol).map(|changed| {
                    if changed {
                        self.scheduler.restart_detail(self.session.detail_tag());
                    }
                });
                self.publish();
                let _ = reply.send(result);
            }
            MonitorCommand::SaveAlert {
                upper,
                lower,
                channel,
                reply,
            } => {
                let result = self.session.save_alert_rule(upper, lower, channel);
                if let Err(ref e) = result {
                    tracing::info!(error = %e, "Alert rule rejected");
                }
                self.publish();
                let _ = reply.send(result);
            }
            MonitorCommand::DisableAlert => {
                self.session.disable_alert();
                self.publish();
            }
            MonitorCommand::Stop => {}
        }
    }

    fn handle_tick(&mut self, event: TickEvent) {
        let outcome = match event {
            TickEvent::Broad {
                seq,
                result: Ok(quotes),
            } => self.session.on_broad_tick_result(seq, quotes),
            TickEvent::Broad {
                seq,
                result: Err(err),
            } => {
                telemetry::increment(CounterMetric::FetchFailures);
                self.session.on_broad_tick_failure(seq, err)
            }
            TickEvent::Detail {
                tag,
                result: Ok(quote),
            } => self
                .session
                .on_detail_tick_result(&tag, quote)
                .map(|event| {
                    if let Some(event) = event {
                        self.dispatch(&event);
                    }
                }),
            TickEvent::Detail {
                tag,
                result: Err(err),
            } => {
                telemetry::increment(CounterMetric::FetchFailures);
                self.session.on_detail_tick_failure(&tag, err)
            }
        };

        match outcome {
            Ok(()) => self.publish(),
            Err(e) if e.is_internal() => {
                tracing::debug!(error = %e, "Dropping stale result");
                telemetry::increment(CounterMetric::StaleResults);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Result rejected");
            }
        }
    }

    /// Hand a crossing to its notification channel
    fn dispatch(&self, event: &CrossingEvent) {
        let label = self.session.snapshot().label_for(&event.symbol);
        self.notifier.notify(event.channel, &event.message(&label));
        telemetry::increment(CounterMetric::AlertsFired);
    }

    fn publish(&self) {
        let snapshot = self.session.snapshot();

        telemetry::set_gauge(GaugeMetric::SeriesLength, snapshot.series.len() as f64);
        if let Some(price) = snapshot.current_price() {
            if let Some(price) = price.to_f64() {
                telemetry::set_gauge(GaugeMetric::SelectedPrice, price);
            }
        }

        self.snapshots.send_replace(snapshot);
    }
}
