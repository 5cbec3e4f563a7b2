//! TCP front end for the registry.

mod config;
mod listener;

pub use config::{
    ServerConfig, DEFAULT_PORT, ENV_ADDR, ENV_MAX_CONNECTIONS, ENV_SUBSCRIBER_BUFFER,
};
pub use listener::Server;
