//! Core types shared by the store, the subscriptions and the wire protocol.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// An independent copy of the store contents at one instant.
pub type Snapshot = HashMap<String, String>;

/// Record pushed to every subscriber after a write.
///
/// Serializes to exactly `{"key":"...","value":"..."}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub key: String,
    pub value: String,
}

impl Notification {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A notification serialized once and shared by every subscriber queue.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame(Arc<str>);

impl Frame {
    /// Serialize a notification into a frame.
    pub fn encode(notification: &Notification) -> serde_json::Result<Self> {
        let text = serde_json::to_string(notification)?;
        Ok(Frame(Arc::from(text)))
    }

    /// The JSON text of the frame, without a line terminator.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Decode the frame back into a notification.
    pub fn notification(&self) -> serde_json::Result<Notification> {
        serde_json::from_str(&self.0)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({})", self.0)
    }
}

/// Unique identifier for a registered subscriber.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriberId(pub u64);

impl fmt::Debug for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriberId({})", self.0)
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_wire_shape() {
        let frame = Frame::encode(&Notification::new("color", "blue")).unwrap();
        assert_eq!(frame.as_str(), r#"{"key":"color","value":"blue"}"#);
    }

    #[test]
    fn test_frame_escapes_and_decodes() {
        let original = Notification::new("quote\"key", "line\nbreak");
        let frame = Frame::encode(&original).unwrap();
        assert!(!frame.as_str().contains('\n'));
        assert_eq!(frame.notification().unwrap(), original);
    }
}
