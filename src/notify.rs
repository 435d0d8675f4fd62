use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::model::ProximityAlert;

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast hub delivering proximity alerts to display collaborators.
pub struct AlertHub {
    sender: broadcast::Sender<ProximityAlert>,
}

impl Default for AlertHub {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertHub {
    pub fn new() -> Self {
        Self {
            sender: broadcast::channel(CHANNEL_CAPACITY).0,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProximityAlert> {
        self.sender.subscribe()
    }

    /// Publish an alert. No-op if nobody is listening. Returns the number of
    /// receivers it reached.
    pub fn send(&self, alert: &ProximityAlert) -> usize {
        self.sender.send(alert.clone()).unwrap_or(0)
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Log every alert until the hub is dropped. A lagging receiver skips the
/// overwritten alerts and keeps going. Returns how many alerts were logged.
pub async fn log_alerts(mut alerts: broadcast::Receiver<ProximityAlert>) -> usize {
    let mut logged = 0;
    loop {
        match alerts.recv().await {
            Ok(alert) => {
                info!(space = %alert.space_id, "ALERT {}", alert.message);
                logged += 1;
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("alert log fell behind, {n} alerts dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    logged
}
