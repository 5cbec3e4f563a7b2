//! Registry server listener
//!
//! Handles the TCP accept loop and runs one thread per connection.

use std::io::{BufReader, BufWriter};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use crate::connection::serve_subscription;
use crate::error::{RegistryError, Result};
use crate::protocol::{handle_request, read_line, write_json_line, Request, Response};
use crate::registry::KvRegistry;
use crate::server::config::ServerConfig;

/// Registry server
pub struct Server {
    config: ServerConfig,
    listener: TcpListener,
    registry: Arc<KvRegistry>,
    active: Arc<AtomicUsize>,
    next_connection_id: AtomicU64,
}

/// Holds one connection slot; released on drop.
struct ConnectionSlot(Arc<AtomicUsize>);

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl Server {
    /// Bind a server with a fresh registry built from `config`
    pub fn bind(config: ServerConfig) -> Result<Self> {
        let registry = Arc::new(KvRegistry::with_config(config.registry.clone()));
        Self::with_registry(config, registry)
    }

    /// Bind a server around an existing registry
    pub fn with_registry(config: ServerConfig, registry: Arc<KvRegistry>) -> Result<Self> {
        let listener = TcpListener::bind(config.bind_addr)?;
        tracing::info!(addr = %listener.local_addr()?, "Registry server listening");

        Ok(Self {
            config,
            listener,
            registry,
            active: Arc::new(AtomicUsize::new(0)),
            next_connection_id: AtomicU64::new(1),
        })
    }

    /// Get a reference to the registry
    pub fn registry(&self) -> &Arc<KvRegistry> {
        &self.registry
    }

    /// Address actually bound (resolves port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Number of open connections
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Run the accept loop
    ///
    /// This method blocks for the lifetime of the listener.
    pub fn serve(&self) -> Result<()> {
        for incoming in self.listener.incoming() {
            match incoming {
                Ok(socket) => self.handle_connection(socket),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
        Ok(())
    }

    fn handle_connection(&self, socket: TcpStream) {
        let peer = socket
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        let slot = match self.acquire_slot() {
            Some(slot) => slot,
            None => {
                tracing::warn!(peer = %peer, "Connection rejected: limit reached");
                let mut socket = socket;
                let _ = write_json_line(
                    &mut socket,
                    &Response::from(RegistryError::ConnectionLimit),
                );
                return;
            }
        };

        let connection_id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(connection_id, peer = %peer, "New connection");

        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::debug!(connection_id, error = %e, "Failed to set TCP_NODELAY");
            }
        }

        let registry = Arc::clone(&self.registry);
        let max_line_bytes = self.config.max_line_bytes;

        let spawned = thread::Builder::new()
            .name(format!("kv-conn-{}", connection_id))
            .spawn(move || {
                let _slot = slot;
                if let Err(e) = run_connection(&registry, socket, max_line_bytes) {
                    tracing::debug!(connection_id, error = %e, "Connection error");
                }
                tracing::debug!(connection_id, "Connection closed");
            });

        if let Err(e) = spawned {
            tracing::error!(connection_id, error = %e, "Failed to spawn connection thread");
        }
    }

    fn acquire_slot(&self) -> Option<ConnectionSlot> {
        let max = self.config.max_connections;
        let mut current = self.active.load(Ordering::Acquire);
        loop {
            if max > 0 && current >= max {
                return None;
            }
            match self.active.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(ConnectionSlot(Arc::clone(&self.active))),
                Err(actual) => current = actual,
            }
        }
    }
}

/// Serve request lines until the peer closes or subscribes.
fn run_connection(registry: &KvRegistry, socket: TcpStream, max_line_bytes: usize) -> Result<()> {
    let mut reader = BufReader::new(socket.try_clone()?);
    let mut writer = BufWriter::new(socket.try_clone()?);

    loop {
        let line = match read_line(&mut reader, max_line_bytes) {
            Ok(Some(line)) => line,
            Ok(None) => return Ok(()),
            Err(e @ RegistryError::Protocol(_)) => {
                write_json_line(&mut writer, &Response::from(e))?;
                continue;
            }
            Err(e) => return Err(e),
        };

        if line.trim().is_empty() {
            continue;
        }

        let request = match Request::parse(&line) {
            Ok(request) => request,
            Err(e) => {
                write_json_line(&mut writer, &Response::from(e))?;
                continue;
            }
        };

        if request == Request::Subscribe {
            // Registered before the ack, so every write after it is delivered
            let handle = registry.subscribe();
            if let Err(e) = write_json_line(&mut writer, &Response::Subscribed) {
                registry.unsubscribe(handle.id());
                return Err(e);
            }
            drop(writer);
            let summary = serve_subscription(registry, handle, reader, socket)?;
            tracing::debug!(
                subscriber = %summary.id,
                delivered = summary.delivered,
                evicted = summary.evicted,
                "Subscriber finished"
            );
            return Ok(());
        }

        let response = handle_request(registry, request);
        write_json_line(&mut writer, &response)?;
    }
}
