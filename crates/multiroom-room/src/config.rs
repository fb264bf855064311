//! Coordinator configuration.

use std::time::Duration;

use multiroom_tick::TickConfig;
use serde::{Deserialize, Serialize};

/// Settings for the room coordinator.
///
/// ```
/// use std::time::Duration;
/// use multiroom_room::CoordinatorConfig;
///
/// let config = CoordinatorConfig {
///     drain_rate_hz: 20,
///     load_timeout: Some(Duration::from_secs(5)),
///     ..CoordinatorConfig::default()
/// };
/// assert_eq!(config.max_players_limit, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// How often the queues are drained. 0 drains after every event.
    pub drain_rate_hz: u32,

    /// Upper bound on a single space load. `None` waits forever.
    pub load_timeout: Option<Duration>,

    /// Upper bound on a single space unload.
    pub unload_timeout: Option<Duration>,

    /// Create requests allowed to wait at once. Further requests are
    /// rejected on receipt.
    pub max_pending_creations: usize,

    /// Largest `maxPlayers` a client may ask for.
    pub max_players_limit: usize,

    /// Capacity of the coordinator's command channel.
    pub command_channel_size: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            drain_rate_hz: 0,
            load_timeout: Some(Duration::from_secs(30)),
            unload_timeout: Some(Duration::from_secs(30)),
            max_pending_creations: 256,
            max_players_limit: 64,
            command_channel_size: 256,
        }
    }
}

impl CoordinatorConfig {
    /// The drain tick derived from `drain_rate_hz`.
    pub fn tick_config(&self) -> TickConfig {
        TickConfig::with_rate(self.drain_rate_hz)
    }

    /// `true` when queues are drained after every event.
    pub fn is_event_driven(&self) -> bool {
        self.drain_rate_hz == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinator_config_default() {
        let config = CoordinatorConfig::default();
        assert!(config.is_event_driven());
        assert_eq!(config.load_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.max_pending_creations, 256);
        assert_eq!(config.max_players_limit, 64);
    }

    #[test]
    fn test_tick_config_follows_drain_rate() {
        let config = CoordinatorConfig {
            drain_rate_hz: 20,
            ..Default::default()
        };
        assert!(!config.is_event_driven());
        assert_eq!(config.tick_config().period(), Some(Duration::from_millis(50)));
    }

    #[test]
    fn test_coordinator_config_deserializes_from_json() {
        let raw = r#"{
            "drain_rate_hz": 10,
            "load_timeout": { "secs": 2, "nanos": 0 },
            "unload_timeout": null,
            "max_pending_creations": 8,
            "max_players_limit": 16,
            "command_channel_size": 32
        }"#;
        let config: CoordinatorConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.load_timeout, Some(Duration::from_secs(2)));
        assert_eq!(config.unload_timeout, None);
        assert_eq!(config.max_players_limit, 16);
    }
}
