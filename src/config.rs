use std::path::PathBuf;
use std::time::Duration;

use crate::limits::DEFAULT_TICK_SECS;

/// Service settings, read from `ROOMWATCH_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub tick: Duration,
    pub fixture: Option<PathBuf>,
    pub metrics_port: Option<u16>,
    pub include_pending: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(DEFAULT_TICK_SECS),
            fixture: None,
            metrics_port: None,
            include_pending: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unparsable values fall back to defaults.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let tick_secs: u64 = get("ROOMWATCH_TICK_SECS")
            .and_then(|s| s.parse().ok())
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_TICK_SECS);
        let metrics_port: Option<u16> = get("ROOMWATCH_METRICS_PORT").and_then(|s| s.parse().ok());
        let include_pending = get("ROOMWATCH_INCLUDE_PENDING")
            .map(|s| matches!(s.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        Self {
            tick: Duration::from_secs(tick_secs),
            fixture: get("ROOMWATCH_FIXTURE").map(PathBuf::from),
            metrics_port,
            include_pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(Config::from_lookup(lookup(&[])), Config::default());
    }

    #[test]
    fn reads_every_key() {
        let cfg = Config::from_lookup(lookup(&[
            ("ROOMWATCH_TICK_SECS", "5"),
            ("ROOMWATCH_METRICS_PORT", "9100"),
            ("ROOMWATCH_INCLUDE_PENDING", "true"),
            ("ROOMWATCH_FIXTURE", "/etc/roomwatch/fixture.json"),
        ]));
        assert_eq!(cfg.tick, Duration::from_secs(5));
        assert_eq!(cfg.metrics_port, Some(9100));
        assert!(cfg.include_pending);
        assert_eq!(cfg.fixture, Some(PathBuf::from("/etc/roomwatch/fixture.json")));
    }

    #[test]
    fn garbage_falls_back() {
        let cfg = Config::from_lookup(lookup(&[
            ("ROOMWATCH_TICK_SECS", "0"),
            ("ROOMWATCH_METRICS_PORT", "not-a-port"),
        ]));
        assert_eq!(cfg.tick, Duration::from_secs(DEFAULT_TICK_SECS));
        assert_eq!(cfg.metrics_port, None);
    }
}
