//! Subscription types for live updates.

use crate::types::{Frame, SubscriberId};
use crossbeam_channel::{Receiver, RecvError, RecvTimeoutError, TryRecvError};
use std::time::Duration;

/// What to do when a subscriber's queue is full at broadcast time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Skip this notification for the slow subscriber and keep it registered.
    #[default]
    DropMessage,
    /// Deregister the slow subscriber. Its delivery side sees the queue close.
    DropSubscriber,
}

/// Configuration for subscriptions.
#[derive(Clone, Debug)]
pub struct SubscriptionConfig {
    /// Max queued frames per subscriber.
    /// Default: 1000
    pub buffer_size: usize,

    /// Behavior when the queue is full.
    pub overflow: OverflowPolicy,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1000,
            overflow: OverflowPolicy::default(),
        }
    }
}

impl SubscriptionConfig {
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    pub fn overflow(mut self, policy: OverflowPolicy) -> Self {
        self.overflow = policy;
        self
    }
}

/// Outcome of a single broadcast.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Frames enqueued.
    pub delivered: usize,
    /// Frames skipped because a queue was full.
    pub dropped: usize,
    /// Subscribers removed during this broadcast.
    pub pruned: usize,
}

/// Receiving end of a subscription.
///
/// Dropping the handle disconnects the queue; the next broadcast prunes the
/// subscriber.
pub struct SubscriptionHandle {
    pub(crate) id: SubscriberId,
    pub(crate) receiver: Receiver<Frame>,
}

impl SubscriptionHandle {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Block until the next frame. Errors once the subscriber is removed.
    pub fn recv(&self) -> Result<Frame, RecvError> {
        self.receiver.recv()
    }

    pub fn try_recv(&self) -> Result<Frame, TryRecvError> {
        self.receiver.try_recv()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<Frame, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Frames currently queued.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Iterate frames until the subscriber is removed.
    pub fn iter(&self) -> impl Iterator<Item = Frame> + '_ {
        self.receiver.iter()
    }
}
