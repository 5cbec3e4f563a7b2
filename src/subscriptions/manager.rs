//! Subscriber registry for broadcasting writes.

use crate::types::{Frame, Notification, SubscriberId};
use crossbeam_channel::{bounded, Sender, TrySendError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::types::{BroadcastReport, OverflowPolicy, SubscriptionConfig, SubscriptionHandle};

/// Internal subscriber state.
struct Subscriber {
    sender: Sender<Frame>,
}

/// Result of offering a frame to one subscriber.
enum Offer {
    Queued,
    Full,
    Gone,
}

impl Subscriber {
    fn offer(&self, frame: &Frame) -> Offer {
        match self.sender.try_send(frame.clone()) {
            Ok(()) => Offer::Queued,
            Err(TrySendError::Full(_)) => Offer::Full,
            Err(TrySendError::Disconnected(_)) => Offer::Gone,
        }
    }
}

/// The dynamic set of live subscribers.
///
/// Subscribe, unsubscribe and broadcast all take the same mutex. Broadcast
/// only enqueues into bounded per-subscriber channels while holding it, so a
/// slow reader on the other end of a queue never blocks the writer.
pub struct SubscriberRegistry {
    /// Active subscribers by ID.
    subscribers: Mutex<HashMap<SubscriberId, Subscriber>>,
    /// Counter for generating subscriber IDs.
    next_id: AtomicU64,
    config: SubscriptionConfig,
}

impl SubscriberRegistry {
    /// Create a registry with the default configuration.
    pub fn new() -> Self {
        Self::with_config(SubscriptionConfig::default())
    }

    pub fn with_config(config: SubscriptionConfig) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            config,
        }
    }

    pub fn config(&self) -> &SubscriptionConfig {
        &self.config
    }

    /// Register a new subscriber. Every later broadcast includes it.
    pub fn subscribe(&self) -> SubscriptionHandle {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(self.config.buffer_size.max(1));

        self.subscribers.lock().insert(id, Subscriber { sender });
        tracing::debug!(subscriber = %id, "Subscriber added");

        SubscriptionHandle { id, receiver }
    }

    /// Deregister a subscriber.
    ///
    /// Idempotent: returns `false` and does nothing if `id` is unknown or was
    /// already removed.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.subscribers.lock().remove(&id).is_some();
        if removed {
            tracing::debug!(subscriber = %id, "Subscriber removed");
        }
        removed
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.lock().contains_key(&id)
    }

    /// Get subscriber count.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Send `notification` to every registered subscriber.
    ///
    /// Best effort: a full or closed queue never stops delivery to the rest
    /// and never fails the call. Subscribers whose receiving side is gone are
    /// pruned here; full queues are handled per [`OverflowPolicy`].
    pub fn broadcast(&self, notification: &Notification) -> BroadcastReport {
        let frame = match Frame::encode(notification) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(key = %notification.key, error = %e, "Failed to encode notification");
                return BroadcastReport::default();
            }
        };
        self.broadcast_frame(&frame)
    }

    /// Send an already encoded frame to every registered subscriber.
    pub fn broadcast_frame(&self, frame: &Frame) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let policy = self.config.overflow;

        let mut subs = self.subscribers.lock();
        subs.retain(|id, sub| match sub.offer(frame) {
            Offer::Queued => {
                report.delivered += 1;
                true
            }
            Offer::Full => match policy {
                OverflowPolicy::DropMessage => {
                    report.dropped += 1;
                    tracing::debug!(subscriber = %id, "Subscriber queue full, notification skipped");
                    true
                }
                OverflowPolicy::DropSubscriber => {
                    report.dropped += 1;
                    report.pruned += 1;
                    tracing::warn!(subscriber = %id, "Subscriber queue full, dropping subscriber");
                    false
                }
            },
            Offer::Gone => {
                report.pruned += 1;
                tracing::debug!(subscriber = %id, "Subscriber disconnected, pruning");
                false
            }
        });

        report
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}
