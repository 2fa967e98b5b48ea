//! Monitor loop driven by a scripted quote source under paused time

use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

use crypto_alert::alert::AlertChannel;
use crypto_alert::monitor::Monitor;
use crypto_alert::quote::{Quote, QuoteError, Symbol};
use crypto_alert::session::{AlertStatus, SessionPhase};
use crypto_alert::MonitorError;

use crate::common::{
    base_time, scheduler_config, session, wait_for, RecordingNotifier, ScriptedSource,
};

#[tokio::test(start_paused = true)]
async fn test_late_result_for_previous_selection_is_dropped() {
    let source = ScriptedSource::new();
    let release_btc = source.gate_detail("bitcoin");
    source.push_prices("ethereum", &[dec!(3500)]);

    let monitor = Monitor::new(
        session("bitcoin"),
        source.clone(),
        scheduler_config(),
        Arc::new(RecordingNotifier::default()),
    );
    let (handle, join) = monitor.spawn();

    source.wait_for_detail_call("bitcoin").await;
    handle.select(Symbol::new("ethereum")).await.unwrap();

    let state = wait_for(&handle, |s| s.phase == SessionPhase::Ready).await;
    assert_eq!(state.selected, Symbol::new("ethereum"));
    assert_eq!(state.current_price(), Some(dec!(3500)));

    // The bitcoin fetch issued before the switch resolves now
    release_btc
        .send(Ok(Quote::new("bitcoin", dec!(50000))))
        .unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let state = handle.snapshot();
    assert_eq!(state.selected, Symbol::new("ethereum"));
    assert_eq!(state.current_price(), Some(dec!(3500)));
    assert_eq!(state.series.len(), 1);
    assert_eq!(state.series.symbol(), &Symbol::new("ethereum"));
    assert!(state.chart().iter().all(|s| s.price == dec!(3500)));

    handle.stop().await;
    join.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_detail_series_filters_unchanged_prices() {
    let source = ScriptedSource::new();
    source.push_prices(
        "bitcoin",
        &[dec!(100), dec!(100.005), dec!(100.02), dec!(105)],
    );

    let monitor = Monitor::new(
        session("bitcoin"),
        source.clone(),
        scheduler_config(),
        Arc::new(RecordingNotifier::default()),
    );
    let (handle, join) = monitor.spawn();

    let state = wait_for(&handle, |s| s.current_price() == Some(dec!(105))).await;
    let prices: Vec<_> = state.chart().iter().map(|s| s.price).collect();
    assert_eq!(prices, vec![dec!(100), dec!(100.02), dec!(105)]);
    assert_eq!(source.detail_calls("bitcoin"), 4);

    handle.stop().await;
    join.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_alert_fires_once_then_disarms() {
    let source = ScriptedSource::new();
    source.push_prices("bitcoin", &[dec!(100), dec!(105), dec!(106), dec!(90)]);

    let mut session = session("bitcoin");
    session
        .save_alert_rule(Some(dec!(105)), Some(dec!(95)), AlertChannel::Browser)
        .unwrap();

    let notifier = Arc::new(RecordingNotifier::default());
    let monitor = Monitor::new(session, source.clone(), scheduler_config(), notifier.clone());
    let (handle, join) = monitor.spawn();

    let state = wait_for(&handle, |s| s.current_price() == Some(dec!(90))).await;
    assert_eq!(state.alert_status(), AlertStatus::Disarmed);

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, AlertChannel::Browser);
    assert_eq!(sent[0].1, "BTC crossed above upper limit $105: now $105");

    handle.stop().await;
    join.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_save_alert_validates_range() {
    let source = ScriptedSource::new();
    let monitor = Monitor::new(
        session("bitcoin"),
        source.clone(),
        scheduler_config(),
        Arc::new(RecordingNotifier::default()),
    );
    let (handle, join) = monitor.spawn();

    assert_ok!(
        handle
            .save_alert(Some(dec!(70000)), Some(dec!(60000)), AlertChannel::Telegram)
            .await
    );

    let err = assert_err!(
        handle
            .save_alert(Some(dec!(100)), Some(dec!(200)), AlertChannel::Browser)
            .await
    );
    assert!(matches!(err, MonitorError::InvalidRuleRange { .. }));

    let state = handle.snapshot();
    let rule = state.rule.as_ref().unwrap();
    assert_eq!(rule.upper(), dec!(70000));
    assert_eq!(rule.lower(), dec!(60000));
    assert_eq!(rule.channel(), AlertChannel::Telegram);
    assert!(rule.is_armed());

    handle.disable_alert().await.unwrap();
    let state = wait_for(&handle, |s| s.alert_status() == AlertStatus::Disarmed).await;
    assert_eq!(state.rule.as_ref().unwrap().upper(), dec!(70000));

    handle.stop().await;
    join.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_initial_failure_then_stale_but_available() {
    let source = ScriptedSource::new();
    source.push_detail("bitcoin", Err(QuoteError::Network("503".into())));
    source.push_prices("bitcoin", &[dec!(64000)]);
    source.push_detail("bitcoin", Err(QuoteError::Network("timeout".into())));

    let monitor = Monitor::new(
        session("bitcoin"),
        source.clone(),
        scheduler_config(),
        Arc::new(RecordingNotifier::default()),
    );
    let (handle, join) = monitor.spawn();

    let state = wait_for(&handle, |s| s.phase == SessionPhase::Error).await;
    assert!(state.latest_quote.is_none());

    let state = wait_for(&handle, |s| s.phase == SessionPhase::Ready).await;
    assert_eq!(state.current_price(), Some(dec!(64000)));
    assert!(state.last_error.is_none());

    let state = wait_for(&handle, |s| s.last_error.is_some()).await;
    assert_eq!(state.phase, SessionPhase::Ready);
    assert_eq!(state.current_price(), Some(dec!(64000)));
    assert_eq!(
        state.last_error,
        Some(QuoteError::Network("timeout".into()))
    );

    handle.stop().await;
    join.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_broad_refresh_updates_all_symbols() {
    let source = ScriptedSource::new();
    let mut quotes = HashMap::new();
    quotes.insert(Symbol::new("bitcoin"), Quote::new("bitcoin", dec!(64000)));
    quotes.insert(Symbol::new("cardano"), Quote::new("cardano", dec!(0.45)));
    source.push_broad(Ok(quotes));
    source.push_broad(Err(QuoteError::Network("429".into())));

    let monitor = Monitor::new(
        session("ethereum"),
        source.clone(),
        scheduler_config(),
        Arc::new(RecordingNotifier::default()),
    );
    let (handle, join) = monitor.spawn();

    let state = wait_for(&handle, |s| s.price_of(&Symbol::new("bitcoin")).is_some()).await;
    assert_eq!(state.price_of(&Symbol::new("cardano")), Some(dec!(0.45)));
    assert_eq!(state.price_of(&Symbol::new("ethereum")), None);
    assert_eq!(state.phase, SessionPhase::Loading);

    // A failed broad refresh keeps prices and phase
    let state = wait_for(&handle, |s| s.last_error.is_some()).await;
    assert_eq!(state.phase, SessionPhase::Loading);
    assert_eq!(state.price_of(&Symbol::new("bitcoin")), Some(dec!(64000)));

    handle.stop().await;
    join.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_select_unknown_symbol_rejected() {
    let source = ScriptedSource::new();
    let monitor = Monitor::new(
        session("bitcoin"),
        source.clone(),
        scheduler_config(),
        Arc::new(RecordingNotifier::default()),
    );
    let (handle, join) = monitor.spawn();

    let err = handle.select(Symbol::new("dogecoin")).await.unwrap_err();
    assert_eq!(err, MonitorError::UnknownSymbol("dogecoin".into()));
    assert_eq!(handle.snapshot().selected, Symbol::new("bitcoin"));

    handle.stop().await;
    join.await.unwrap();
    assert_eq!(
        handle.select(Symbol::new("ethereum")).await,
        Err(MonitorError::Stopped)
    );
}

#[tokio::test(start_paused = true)]
async fn test_detail_reply_for_wrong_symbol_is_an_error() {
    let source = ScriptedSource::new();
    source.push_detail("bitcoin", Ok(Quote::new("ethereum", dec!(1))));

    let monitor = Monitor::new(
        session("bitcoin"),
        source.clone(),
        scheduler_config(),
        Arc::new(RecordingNotifier::default()),
    );
    let (handle, join) = monitor.spawn();

    let state = wait_for(&handle, |s| s.phase == SessionPhase::Error).await;
    assert!(matches!(
        state.last_error,
        Some(QuoteError::MalformedResponse(_))
    ));
    assert!(state.latest_quote.is_none());
    assert!(state.series.is_empty());

    handle.stop().await;
    join.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_slow_broad_fetch_does_not_overwrite_newer_one() {
    let source = ScriptedSource::new();
    let release_first = source.gate_broad();
    source.push_broad(Ok(HashMap::from([(
        Symbol::new("cardano"),
        Quote::new("cardano", dec!(2)),
    )])));

    let monitor = Monitor::new(
        session("bitcoin"),
        source.clone(),
        scheduler_config(),
        Arc::new(RecordingNotifier::default()),
    );
    let (handle, join) = monitor.spawn();

    // Second broad tick at 30s answers while the first is still open
    wait_for(&handle, |s| s.price_of(&Symbol::new("cardano")) == Some(dec!(2))).await;

    release_first
        .send(Ok(HashMap::from([(
            Symbol::new("cardano"),
            Quote::new("cardano", dec!(1)),
        )])))
        .unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let state = handle.snapshot();
    assert_eq!(state.price_of(&Symbol::new("cardano")), Some(dec!(2)));

    handle.stop().await;
    join.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_slow_detail_fetch_does_not_overwrite_newer_one() {
    let source = ScriptedSource::new();
    let release_first = source.gate_detail("bitcoin");
    source.push_prices("bitcoin", &[dec!(65000)]);

    let monitor = Monitor::new(
        session("bitcoin"),
        source.clone(),
        scheduler_config(),
        Arc::new(RecordingNotifier::default()),
    );
    let (handle, join) = monitor.spawn();

    // Second detail tick at 15s answers while the first is still open
    wait_for(&handle, |s| s.current_price() == Some(dec!(65000))).await;

    release_first
        .send(Ok(Quote::new("bitcoin", dec!(60000)).with_observed_at(base_time())))
        .unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let state = handle.snapshot();
    assert_eq!(state.phase, SessionPhase::Ready);
    assert_eq!(state.current_price(), Some(dec!(65000)));
    assert_eq!(state.series.len(), 1);
    assert!(state.last_error.is_none());

    handle.stop().await;
    join.await.unwrap();
}
