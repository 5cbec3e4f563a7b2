//! # KV Registry
//!
//! A shared in-memory key/value registry that pushes every write to live
//! subscribers.
//!
//! ## Core Concepts
//!
//! - **Store**: string keys to string values, last write wins, read-write locked
//! - **Subscribers**: bounded per-subscriber queues fed by a non-blocking broadcast
//! - **Registry**: a store and its subscribers written through together
//! - **Server**: newline-delimited JSON over TCP, one thread per connection
//!
//! ## Example
//!
//! ```ignore
//! use kv_registry::KvRegistry;
//!
//! let registry = KvRegistry::new();
//! let feed = registry.subscribe();
//!
//! registry.set("color", "blue");
//!
//! assert_eq!(registry.get("color").as_deref(), Some("blue"));
//! assert_eq!(feed.recv()?.as_str(), r#"{"key":"color","value":"blue"}"#);
//! ```

pub mod client;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod store;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use client::{Client, Subscription, DEFAULT_MAX_RESPONSE_BYTES};
pub use connection::{
    serve_subscriber, serve_subscription, Disconnect, SubscriberStream, SubscriberSummary,
};
pub use error::{RegistryError, Result};
pub use protocol::{handle_request, Request, Response};
pub use registry::{KvRegistry, RegistryConfig};
pub use server::{Server, ServerConfig};
pub use store::Store;
pub use subscriptions::{
    BroadcastReport, OverflowPolicy, SubscriberRegistry, SubscriptionConfig, SubscriptionHandle,
};
pub use types::*;
