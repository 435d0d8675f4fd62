use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use roomwatch::config::Config;
use roomwatch::engine::{Engine, OccupancyPolicy};
use roomwatch::model::minute_label;
use roomwatch::notify::{self, AlertHub};
use roomwatch::proximity::{AlertLedger, ProximityEngine};
use roomwatch::store::MemoryFeed;
use roomwatch::watcher;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    roomwatch::observability::init(config.metrics_port)?;

    let policy = OccupancyPolicy {
        include_pending: config.include_pending,
    };
    let feed = match &config.fixture {
        Some(path) => {
            let json = tokio::fs::read_to_string(path).await?;
            Arc::new(MemoryFeed::from_json_with_policy(&json, policy)?)
        }
        None => {
            warn!("ROOMWATCH_FIXTURE not set, starting with an empty store");
            Arc::new(MemoryFeed::with_policy(policy))
        }
    };

    info!("roomwatch starting");
    info!("  spaces: {}", feed.space_count());
    info!("  tick: {:?}", config.tick);
    info!("  pending loans occupy: {}", config.include_pending);
    info!("  metrics: {}", config.metrics_port.map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics")));

    let engine = Engine::new(feed.clone(), feed.clone(), feed.clone(), policy);
    let today = chrono::Local::now().date_naive();
    for space in feed.spaces() {
        match engine.free_slots(space.id, today).await {
            Ok(free) => {
                let slots: Vec<String> = free
                    .iter()
                    .map(|s| format!("{}-{}", minute_label(s.start), minute_label(s.end)))
                    .collect();
                info!("{} free today: {}", space.name, slots.join(", "));
            }
            Err(e) => warn!("{}: {e}", space.name),
        }
    }

    let hub = Arc::new(AlertHub::new());
    let alerts = hub.subscribe();
    tokio::spawn(notify::log_alerts(alerts));

    let proximity = Arc::new(ProximityEngine::new(Arc::new(AlertLedger::new())));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let watcher = tokio::spawn(watcher::run_watcher(
        proximity,
        feed.clone(),
        hub,
        config.tick,
        shutdown_rx,
    ));

    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }

    info!("shutdown signal received, stopping watcher");
    let _ = shutdown_tx.send(true);
    watcher.await?;
    info!("roomwatch stopped");
    Ok(())
}
