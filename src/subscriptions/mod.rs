//! Live notifications for registry writes.
//!
//! Every subscriber owns a bounded queue. A broadcast encodes the
//! notification once and offers the same frame to each queue without
//! blocking; a separate delivery worker per subscriber drains its queue into
//! the subscriber's stream (see [`crate::connection`]).
//!
//! - Full queues skip the frame or drop the subscriber, per [`OverflowPolicy`]
//! - Queues whose receiver is gone are pruned on the next broadcast
//!
//! # Example
//!
//! ```ignore
//! let registry = SubscriberRegistry::new();
//! let handle = registry.subscribe();
//!
//! registry.broadcast(&Notification::new("color", "blue"));
//!
//! for frame in handle.iter() {
//!     println!("{}", frame.as_str());
//! }
//! ```

mod manager;
mod types;

pub use manager::SubscriberRegistry;
pub use types::{BroadcastReport, OverflowPolicy, SubscriptionConfig, SubscriptionHandle};
