//! Server configuration

use std::net::SocketAddr;
use std::str::FromStr;

use crate::error::{RegistryError, Result};
use crate::protocol::DEFAULT_MAX_LINE_BYTES;
use crate::registry::RegistryConfig;

/// Environment variable holding the bind / connect address.
pub const ENV_ADDR: &str = "KV_REGISTRY_ADDR";
/// Environment variable limiting concurrent connections.
pub const ENV_MAX_CONNECTIONS: &str = "KV_REGISTRY_MAX_CONNECTIONS";
/// Environment variable sizing each subscriber's queue.
pub const ENV_SUBSCRIBER_BUFFER: &str = "KV_REGISTRY_SUBSCRIBER_BUFFER";

/// Default port, shared by server and client.
pub const DEFAULT_PORT: u16 = 8080;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// Longest accepted request line
    pub max_line_bytes: usize,

    /// Registry settings
    pub registry: RegistryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            max_connections: 0, // Unlimited
            tcp_nodelay: true,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            registry: RegistryConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Load from `KV_REGISTRY_*` environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup(ENV_ADDR) {
            config.bind_addr = parse_var(ENV_ADDR, &addr)?;
        }
        if let Some(max) = lookup(ENV_MAX_CONNECTIONS) {
            config.max_connections = parse_var(ENV_MAX_CONNECTIONS, &max)?;
        }
        if let Some(size) = lookup(ENV_SUBSCRIBER_BUFFER) {
            let size: usize = parse_var(ENV_SUBSCRIBER_BUFFER, &size)?;
            if size == 0 {
                return Err(RegistryError::Config(format!(
                    "{} must be at least 1",
                    ENV_SUBSCRIBER_BUFFER
                )));
            }
            config.registry.subscription.buffer_size = size;
        }

        Ok(config)
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the request line limit
    pub fn max_line_bytes(mut self, max: usize) -> Self {
        self.max_line_bytes = max.max(1);
        self
    }

    /// Set per-subscriber queue size
    pub fn subscriber_buffer(mut self, size: usize) -> Self {
        self.registry.subscription.buffer_size = size.max(1);
        self
    }
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| RegistryError::Config(format!("{}={:?}: {}", name, raw, e)))
}
