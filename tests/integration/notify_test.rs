//! Alert delivery through the notification router

use rust_decimal_macros::dec;
use std::sync::Arc;

use crypto_alert::alert::{
    AlertChannel, ExternalDelivery, LocalNotifier, NotificationRouter, OutboundNotification,
};
use crypto_alert::monitor::Monitor;

use crate::common::{scheduler_config, session, wait_for, ScriptedSource};

#[tokio::test(start_paused = true)]
async fn test_email_alert_reaches_external_delivery() {
    let source = ScriptedSource::new();
    source.push_prices("ethereum", &[dec!(100), dec!(94)]);

    let mut session = session("ethereum");
    session
        .save_alert_rule(Some(dec!(105)), Some(dec!(95)), AlertChannel::Email)
        .unwrap();

    let (external, mut outbound) = ExternalDelivery::channel(8);
    let router = NotificationRouter::new(
        Arc::new(LocalNotifier::new(Box::new(std::io::sink()))),
        Arc::new(external),
    );

    let monitor = Monitor::new(session, source.clone(), scheduler_config(), Arc::new(router));
    let (handle, join) = monitor.spawn();

    wait_for(&handle, |s| s.current_price() == Some(dec!(94))).await;

    assert_eq!(
        outbound.try_recv().unwrap(),
        OutboundNotification {
            channel: AlertChannel::Email,
            message: "ETH crossed below lower limit $95: now $94".to_string(),
        }
    );
    assert!(outbound.try_recv().is_err());

    handle.stop().await;
    join.await.unwrap();
}
