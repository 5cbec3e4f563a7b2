//! Error types for the registry.

use thiserror::Error;

/// Main error type for registry, protocol and server operations.
///
/// The core (`Store`, `SubscriberRegistry`, `KvRegistry`) never fails; these
/// errors come from the request surface and the transport around it.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Connection limit reached")]
    ConnectionLimit,

    #[error("Server returned an error: {0}")]
    Server(String),
}

impl From<serde_json::Error> for RegistryError {
    fn from(e: serde_json::Error) -> Self {
        RegistryError::Serialization(e.to_string())
    }
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
