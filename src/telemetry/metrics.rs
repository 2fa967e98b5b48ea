//! Prometheus metrics

use std::time::Duration;

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// Batched multi-symbol quote fetch
    BroadFetch,
    /// Single-symbol detail quote fetch
    DetailFetch,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Latest price of the selected symbol
    SelectedPrice,
    /// Samples retained in the chart series
    SeriesLength,
}

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Threshold crossings reported
    AlertsFired,
    /// Fetch results discarded after a switch or cancellation
    StaleResults,
    /// Failed quote fetches
    FetchFailures,
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    let metric_name = match metric {
        LatencyMetric::BroadFetch => "cryptoalert_broad_fetch_latency_ms",
        LatencyMetric::DetailFetch => "cryptoalert_detail_fetch_latency_ms",
    };

    metrics::histogram!(metric_name).record(duration.as_secs_f64() * 1000.0);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    let metric_name = match metric {
        GaugeMetric::SelectedPrice => "cryptoalert_selected_price_usd",
        GaugeMetric::SeriesLength => "cryptoalert_series_length",
    };

    metrics::gauge!(metric_name).set(value);
}

/// Increment a counter by one
pub fn increment(metric: CounterMetric) {
    let metric_name = match metric {
        CounterMetric::AlertsFired => "cryptoalert_alerts_fired_total",
        CounterMetric::StaleResults => "cryptoalert_stale_results_total",
        CounterMetric::FetchFailures => "cryptoalert_fetch_failures_total",
    };

    metrics::counter!(metric_name).increment(1);
}
