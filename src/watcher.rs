use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::feed::{ActionFeed, FeedError};
use crate::notify::AlertHub;
use crate::proximity::ProximityEngine;

/// One watcher tick: fetch upcoming actions, evaluate thresholds, publish.
/// On feed failure nothing is emitted and the ledger is left untouched.
pub async fn watch_once(
    engine: &ProximityEngine,
    feed: &dyn ActionFeed,
    hub: &AlertHub,
    now: NaiveDateTime,
) -> Result<usize, FeedError> {
    let started = std::time::Instant::now();
    let upcoming = match feed.fetch_upcoming_actions(now).await {
        Ok(upcoming) => upcoming,
        Err(e) => {
            metrics::counter!(crate::observability::TICKS_TOTAL, "status" => "feed_error").increment(1);
            return Err(e);
        }
    };
    let alerts = engine.tick(now, &upcoming);
    for alert in &alerts {
        hub.send(alert);
    }
    metrics::counter!(crate::observability::TICKS_TOTAL, "status" => "ok").increment(1);
    metrics::histogram!(crate::observability::TICK_DURATION_SECONDS)
        .record(started.elapsed().as_secs_f64());
    Ok(alerts.len())
}

/// Background task that periodically evaluates proximity alerts.
///
/// Ticks run one at a time; if a tick overruns the period the missed ticks are
/// dropped, not queued. Runs until `shutdown` becomes true or its sender drops.
pub async fn run_watcher(
    engine: Arc<ProximityEngine>,
    feed: Arc<dyn ActionFeed>,
    hub: Arc<AlertHub>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!("proximity watcher started, period {period:?}");
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }
        let now = chrono::Local::now().naive_local();
        match watch_once(&engine, feed.as_ref(), &hub, now).await {
            Ok(0) => {}
            Ok(n) => tracing::debug!("watcher emitted {n} alerts"),
            Err(e) => warn!("watcher tick skipped: {e}"),
        }
    }
    info!("proximity watcher stopped");
}
