//! Cache change notifications.
//!
//! Every state change of the query cache is published on a broadcast channel so consumers can
//! re-render explicitly instead of polling.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use super::config::CacheConfig;
use super::keys::QueryKey;

/// Monotonic fetch sequence number. Issued from one process-wide counter, so a higher number
/// always means a later request.
pub type Seq = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CacheEvent {
    /// A fetch completed and its page replaced the entry.
    Replaced { key: QueryKey, seq: Seq },
    /// A mutation patched the cached page.
    Patched { key: QueryKey },
    /// The entry was marked stale.
    Invalidated { key: QueryKey },
    /// A fetch failed; the previous page (if any) is kept.
    RefreshFailed {
        key: QueryKey,
        seq: Seq,
        message: String,
    },
    /// A fetch completed after a newer one had already been applied.
    Discarded { key: QueryKey, seq: Seq },
    /// The entry was dropped from the cache.
    Removed { key: QueryKey },
}

impl CacheEvent {
    pub fn key(&self) -> &QueryKey {
        match self {
            Self::Replaced { key, .. }
            | Self::Patched { key }
            | Self::Invalidated { key }
            | Self::RefreshFailed { key, .. }
            | Self::Discarded { key, .. }
            | Self::Removed { key } => key,
        }
    }
}

/// Broadcast fan-out of [`CacheEvent`]s.
pub struct EventBus {
    sender: broadcast::Sender<CacheEvent>,
}

impl EventBus {
    pub fn new(config: &CacheConfig) -> Self {
        let (sender, _) = broadcast::channel(config.event_capacity.get());
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.sender.subscribe()
    }

    /// Publishes to current subscribers. Having none is not an error.
    pub fn publish(&self, event: CacheEvent) {
        let delivered = self.sender.send(event).unwrap_or(0);
        debug!(subscribers = delivered, "Cache event published");
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::types::PageNumber;

    use super::*;

    #[tokio::test]
    async fn subscribers_receive_in_order() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let key = QueryKey::all_posts(PageNumber::FIRST);

        bus.publish(CacheEvent::Invalidated { key: key.clone() });
        bus.publish(CacheEvent::Replaced {
            key: key.clone(),
            seq: 3,
        });

        assert_eq!(
            rx.recv().await.expect("first"),
            CacheEvent::Invalidated { key: key.clone() }
        );
        let second = rx.recv().await.expect("second");
        assert_eq!(second.key(), &key);
        assert!(matches!(second, CacheEvent::Replaced { seq: 3, .. }));
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let bus = EventBus::default();
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(CacheEvent::Removed {
            key: QueryKey::following(PageNumber::FIRST),
        });
    }
}
