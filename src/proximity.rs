//! Open/close proximity alerts for supervised spaces.
//!
//! Each `(space, action, threshold)` key fires once per occurrence. The ledger
//! is injected so tests and independent sessions never share fired state.

use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info};

use crate::limits::ALERT_GRACE_MINUTES;
use crate::model::*;

pub const OPEN_THRESHOLDS: [i64; 3] = [15, 5, 1];
pub const CLOSE_THRESHOLDS: [i64; 3] = [10, 5, 1];

pub fn thresholds(action: Action) -> &'static [i64] {
    match action {
        Action::Open => &OPEN_THRESHOLDS,
        Action::Close => &CLOSE_THRESHOLDS,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlertKey {
    pub space_id: SpaceId,
    pub action: Action,
    pub threshold: i64,
}

/// Set of already-fired alert keys, each remembering when its action is due.
#[derive(Debug, Default)]
pub struct AlertLedger {
    fired: DashMap<AlertKey, NaiveDateTime>,
}

impl AlertLedger {
    pub fn new() -> Self {
        Self {
            fired: DashMap::new(),
        }
    }

    /// Record `key` unless already present. Returns true if it was absent,
    /// i.e. the caller won the right to fire. Atomic per key.
    pub fn try_mark(&self, key: AlertKey, due: NaiveDateTime) -> bool {
        match self.fired.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(due);
                true
            }
        }
    }

    pub fn contains(&self, key: &AlertKey) -> bool {
        self.fired.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fired.is_empty()
    }

    pub fn clear(&self) {
        self.fired.clear();
    }

    /// Forget keys whose action was due more than the grace period before
    /// `now`. Their thresholds cannot fire again for that occurrence.
    pub fn prune(&self, now: NaiveDateTime) -> usize {
        let cutoff = now - Duration::minutes(ALERT_GRACE_MINUTES);
        let before = self.fired.len();
        self.fired.retain(|_, due| *due >= cutoff);
        before.saturating_sub(self.fired.len())
    }
}

pub struct ProximityEngine {
    ledger: Arc<AlertLedger>,
}

impl ProximityEngine {
    pub fn new(ledger: Arc<AlertLedger>) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &Arc<AlertLedger> {
        &self.ledger
    }

    /// Evaluate one snapshot of upcoming actions. Fires on exact threshold
    /// equality only; a key already in the ledger never fires again.
    pub fn tick(&self, now: NaiveDateTime, schedules: &[UpcomingAction]) -> Vec<ProximityAlert> {
        let pruned = self.ledger.prune(now);
        if pruned > 0 {
            debug!("pruned {pruned} stale alert keys");
        }

        let mut alerts = Vec::new();
        for upcoming in schedules {
            let minutes = upcoming.minutes_remaining;
            if !thresholds(upcoming.action).contains(&minutes) {
                continue;
            }
            let key = AlertKey {
                space_id: upcoming.space_id,
                action: upcoming.action,
                threshold: minutes,
            };
            if !self.ledger.try_mark(key, now + Duration::minutes(minutes)) {
                continue;
            }
            let alert = ProximityAlert {
                space_id: upcoming.space_id,
                space_name: upcoming.space_name.clone(),
                action: upcoming.action,
                threshold: minutes,
                minutes_remaining: minutes,
                message: alert_message(&upcoming.space_name, upcoming.action, minutes),
            };
            info!("{}", alert.message);
            let label = match upcoming.action {
                Action::Open => "open",
                Action::Close => "close",
            };
            metrics::counter!(crate::observability::ALERTS_FIRED_TOTAL, "action" => label).increment(1);
            alerts.push(alert);
        }
        metrics::gauge!(crate::observability::ALERT_LEDGER_SIZE).set(self.ledger.len() as f64);
        alerts
    }
}

pub fn alert_message(space_name: &str, action: Action, minutes: i64) -> String {
    let unit = if minutes == 1 { "minute" } else { "minutes" };
    format!("{space_name}: {} in {minutes} {unit}", action.verb())
}
