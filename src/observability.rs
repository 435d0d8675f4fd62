use std::net::SocketAddr;

// ── Occupancy ───────────────────────────────────────────────────

/// Counter: feed fetch failures. Labels: feed.
pub const FEED_FAILURES_TOTAL: &str = "roomwatch_feed_failures_total";

/// Counter: overlapping entry pairs found while aggregating.
pub const TIMELINE_OVERLAPS_TOTAL: &str = "roomwatch_timeline_overlaps_total";

/// Counter: loan submissions. Labels: outcome.
pub const SUBMISSIONS_TOTAL: &str = "roomwatch_submissions_total";

/// Histogram: submission latency in seconds.
pub const SUBMIT_DURATION_SECONDS: &str = "roomwatch_submit_duration_seconds";

// ── Proximity watcher ───────────────────────────────────────────

/// Counter: watcher ticks. Labels: status.
pub const TICKS_TOTAL: &str = "roomwatch_ticks_total";

/// Histogram: tick duration in seconds.
pub const TICK_DURATION_SECONDS: &str = "roomwatch_tick_duration_seconds";

/// Counter: alerts fired. Labels: action.
pub const ALERTS_FIRED_TOTAL: &str = "roomwatch_alerts_fired_total";

/// Gauge: keys held in the alert ledger.
pub const ALERT_LEDGER_SIZE: &str = "roomwatch_alert_ledger_size";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}
