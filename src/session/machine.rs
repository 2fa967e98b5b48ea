//! Monitor session state machine
//!
//! Reacts to scheduler results and user commands. Every transition builds a
//! fresh `SessionState` and swaps it in whole, so observers never see a
//! half-applied update.

use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::state::{DetailTag, SessionPhase, SessionState};
use crate::alert::{AlertChannel, AlertRule, CrossingEvent};
use crate::config::TrackedCoin;
use crate::error::MonitorError;
use crate::quote::{Quote, QuoteError, Symbol};
use crate::series::{Sample, SeriesConfig, SeriesWindow};

/// Orchestrating state machine for one dashboard session
pub struct MonitorSession {
    state: Arc<SessionState>,
    series_config: SeriesConfig,
    /// Highest broad fetch sequence applied so far
    broad_seq: u64,
    /// Highest detail fetch sequence applied for the current generation
    detail_seq: u64,
}

impl MonitorSession {
    /// Create an idle session with `selected` as the initial symbol
    pub fn new(
        coins: Vec<TrackedCoin>,
        selected: Symbol,
        series_config: SeriesConfig,
    ) -> Result<Self, MonitorError> {
        if !coins.iter().any(|c| c.id == selected) {
            return Err(MonitorError::UnknownSymbol(selected.to_string()));
        }

        let all_symbols = coins.iter().map(|c| (c.id.clone(), None)).collect();
        let state = SessionState {
            phase: SessionPhase::Idle,
            series: SeriesWindow::new(selected.clone(), series_config.clone()),
            selected,
            generation: 0,
            latest_quote: None,
            all_symbols,
            rule: None,
            last_error: None,
            coins: coins.into(),
        };

        Ok(Self {
            state: Arc::new(state),
            series_config,
            broad_seq: 0,
            detail_seq: 0,
        })
    }

    /// Current immutable snapshot
    pub fn snapshot(&self) -> Arc<SessionState> {
        Arc::clone(&self.state)
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase
    }

    pub fn selected(&self) -> &Symbol {
        &self.state.selected
    }

    pub fn detail_tag(&self) -> DetailTag {
        self.state.detail_tag()
    }

    /// Identifiers refreshed by the broad tick
    pub fn tracked_symbols(&self) -> Vec<Symbol> {
        self.state.coins.iter().map(|c| c.id.clone()).collect()
    }

    pub fn is_tracked(&self, symbol: &Symbol) -> bool {
        self.state.coins.iter().any(|c| &c.id == symbol)
    }

    /// Build the next state from the current one and swap it in
    fn transition<R>(&mut self, apply: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut next = (*self.state).clone();
        let result = apply(&mut next);
        self.state = Arc::new(next);
        result
    }

    /// Polling started: Idle -> Loading
    pub fn activate(&mut self) {
        if self.state.phase != SessionPhase::Idle {
            return;
        }
        self.transition(|s| s.phase = SessionPhase::Loading);
    }

    /// Switch the selected symbol
    ///
    /// Returns `Ok(true)` when the selection changed and the detail refresh
    /// must restart for the new tag.
    pub fn select_symbol(&mut self, symbol: Symbol) -> Result<bool, MonitorError> {
        if symbol == self.state.selected {
            return Ok(false);
        }
        if !self.is_tracked(&symbol) {
            return Err(MonitorError::UnknownSymbol(symbol.to_string()));
        }

        tracing::info!(from = %self.state.selected, to = %symbol, "Switching selected symbol");

        let series_config = self.series_config.clone();
        self.detail_seq = 0;
        self.transition(|s| {
            s.generation += 1;
            s.series = SeriesWindow::new(symbol.clone(), series_config);
            s.phase = SessionPhase::Loading;
            s.latest_quote = None;
            s.last_error = None;
            s.selected = symbol;
        });

        Ok(true)
    }

    /// Replace the all-symbols snapshot; phase is unaffected
    ///
    /// A result issued before the last applied broad fetch is rejected with
    /// `OutOfOrder` and changes nothing.
    pub fn on_broad_tick_result(
        &mut self,
        seq: u64,
        quotes: HashMap<Symbol, Quote>,
    ) -> Result<(), MonitorError> {
        self.broad_seq = check_seq("broad", seq, self.broad_seq)?;

        let tracked = self.tracked_symbols();
        self.transition(|s| {
            s.all_symbols = tracked
                .into_iter()
                .map(|sym| {
                    let quote = quotes.get(&sym).cloned();
                    (sym, quote)
                })
                .collect::<BTreeMap<_, _>>();
        });
        Ok(())
    }

    /// Record a failed broad refresh; the previous snapshot stays visible
    pub fn on_broad_tick_failure(&mut self, seq: u64, err: QuoteError) -> Result<(), MonitorError> {
        self.broad_seq = check_seq("broad", seq, self.broad_seq)?;

        tracing::warn!(error = %err, "Broad refresh failed");
        self.transition(|s| s.last_error = Some(err));
        Ok(())
    }

    /// Accept a detail outcome only for the current selection and in issue order
    fn admit_detail(&mut self, tag: &DetailTag) -> Result<(), MonitorError> {
        if tag.generation != self.state.generation || tag.symbol != self.state.selected {
            return Err(MonitorError::StaleResult {
                symbol: tag.symbol.clone(),
                issued: tag.generation,
                current: self.state.generation,
            });
        }
        self.detail_seq = check_seq("detail", tag.seq, self.detail_seq)?;
        Ok(())
    }

    /// Apply a detail quote for the current selection
    ///
    /// Appends to the chart series, evaluates the alert rule (disarming it on
    /// a crossing) and moves to `Ready`. The returned event must be handed to
    /// its notification channel. Results for an outdated tag are rejected
    /// with `StaleResult`, and results older than the last applied one with
    /// `OutOfOrder`; both leave the state untouched. A quote for some other
    /// symbol is recorded as a failed fetch.
    pub fn on_detail_tick_result(
        &mut self,
        tag: &DetailTag,
        quote: Quote,
    ) -> Result<Option<CrossingEvent>, MonitorError> {
        self.admit_detail(tag)?;
        if quote.symbol() != &tag.symbol {
            let err = QuoteError::MalformedResponse(format!(
                "quote for {} returned for {}",
                quote.symbol(),
                tag.symbol
            ));
            self.record_detail_failure(&tag.symbol, err);
            return Ok(None);
        }

        let event = self.transition(|s| {
            s.series.append(Sample::from(&quote));
            let event = s.rule.as_mut().and_then(|rule| rule.evaluate(&quote));
            s.latest_quote = Some(quote);
            s.phase = SessionPhase::Ready;
            s.last_error = None;
            event
        });

        if let Some(ref e) = event {
            tracing::info!(
                symbol = %e.symbol,
                kind = ?e.kind,
                price = %e.price,
                limit = %e.limit,
                "Alert fired, rule disarmed"
            );
        }

        Ok(event)
    }

    /// Record a failed detail fetch for the current selection
    ///
    /// Before the first success for this selection the session moves to
    /// `Error`; after it, the last good quote stays on display.
    pub fn on_detail_tick_failure(
        &mut self,
        tag: &DetailTag,
        err: QuoteError,
    ) -> Result<(), MonitorError> {
        self.admit_detail(tag)?;
        self.record_detail_failure(&tag.symbol, err);
        Ok(())
    }

    fn record_detail_failure(&mut self, symbol: &Symbol, err: QuoteError) {
        tracing::warn!(%symbol, error = %err, "Detail refresh failed");

        self.transition(|s| {
            if matches!(s.phase, SessionPhase::Loading | SessionPhase::Idle) {
                s.phase = SessionPhase::Error;
            }
            s.last_error = Some(err);
        });
    }

    /// Validate and arm a new rule for the selected symbol
    ///
    /// On failure the previous rule is left unchanged.
    pub fn save_alert_rule(
        &mut self,
        upper: Option<Decimal>,
        lower: Option<Decimal>,
        channel: AlertChannel,
    ) -> Result<(), MonitorError> {
        let rule = AlertRule::new(self.state.selected.clone(), upper, lower, channel)?;

        tracing::info!(
            symbol = %rule.symbol(),
            upper = %rule.upper(),
            lower = %rule.lower(),
            %channel,
            "Alert armed"
        );

        self.transition(|s| s.rule = Some(rule));
        Ok(())
    }

    /// Disarm the rule but keep its limits visible
    pub fn disable_alert(&mut self) {
        if !self.state.rule.as_ref().is_some_and(|r| r.is_armed()) {
            return;
        }
        tracing::info!("Alert disabled");
        self.transition(|s| {
            if let Some(rule) = s.rule.as_mut() {
                rule.disarm();
            }
        });
    }
}

/// Returns the new high-water mark, or `OutOfOrder` if `seq` is behind it
fn check_seq(refresh: &'static str, seq: u64, applied: u64) -> Result<u64, MonitorError> {
    if seq < applied {
        return Err(MonitorError::OutOfOrder {
            refresh,
            seq,
            applied,
        });
    }
    Ok(seq)
}
