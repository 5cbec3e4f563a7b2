//! The registry: a store plus its subscribers, written through together.

use crate::store::Store;
use crate::subscriptions::{
    BroadcastReport, SubscriberRegistry, SubscriptionConfig, SubscriptionHandle,
};
use crate::types::{Notification, Snapshot, SubscriberId};

/// Registry configuration.
#[derive(Clone, Debug, Default)]
pub struct RegistryConfig {
    pub subscription: SubscriptionConfig,
}

/// A key/value store whose every write is pushed to live subscribers.
///
/// Constructed explicitly and shared by reference (usually behind an `Arc`)
/// with whatever serves requests. Several independent registries can live in
/// one process.
pub struct KvRegistry {
    store: Store,
    subscribers: SubscriberRegistry,
}

impl KvRegistry {
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            store: Store::new(),
            subscribers: SubscriberRegistry::with_config(config.subscription),
        }
    }

    // --- Writes ---

    /// Store `value` under `key`, then notify every current subscriber once.
    ///
    /// The store lock is released before the broadcast starts, so by the time
    /// any subscriber sees the notification the value is readable via `get`.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) -> BroadcastReport {
        let notification = Notification::new(key, value);
        self.store
            .set(notification.key.clone(), notification.value.clone());

        let report = self.subscribers.broadcast(&notification);
        tracing::trace!(
            key = %notification.key,
            delivered = report.delivered,
            dropped = report.dropped,
            pruned = report.pruned,
            "Value set"
        );
        report
    }

    // --- Reads ---

    pub fn get(&self, key: &str) -> Option<String> {
        self.store.get(key)
    }

    pub fn get_all(&self) -> Snapshot {
        self.store.get_all()
    }

    // --- Subscriptions ---

    pub fn subscribe(&self) -> SubscriptionHandle {
        self.subscribers.subscribe()
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.subscriber_count()
    }

    // --- Components ---

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn subscribers(&self) -> &SubscriberRegistry {
        &self.subscribers
    }
}

impl Default for KvRegistry {
    fn default() -> Self {
        Self::new()
    }
}
