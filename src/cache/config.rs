//! Query cache configuration.

use std::num::NonZeroUsize;

use serde::Deserialize;

/// 64 events.
pub const DEFAULT_EVENT_CAPACITY: NonZeroUsize = NonZeroUsize::MIN.saturating_add(63);

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Capacity of the broadcast channel carrying [`super::CacheEvent`]s. Subscribers that
    /// fall further behind than this observe a lag and skip to the newest events.
    pub event_capacity: NonZeroUsize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            event_capacity: settings.event_capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        assert_eq!(CacheConfig::default().event_capacity.get(), 64);
    }

    #[test]
    fn deserialize_fills_defaults() {
        let config: CacheConfig = serde_json::from_str("{}").expect("empty object");
        assert_eq!(config.event_capacity, DEFAULT_EVENT_CAPACITY);
    }

    #[test]
    fn zero_capacity_does_not_deserialize() {
        assert!(serde_json::from_str::<CacheConfig>(r#"{"event_capacity": 0}"#).is_err());
    }
}
