//! Blocking client for the registry server.

use crate::error::{RegistryError, Result};
use crate::protocol::{read_line, write_json_line, Request, Response};
use crate::server::{DEFAULT_PORT, ENV_ADDR};
use crate::types::{Notification, Snapshot};
use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};

/// Longest response or notification line a client accepts by default.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;

/// A request/response connection to a registry server.
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    max_response_bytes: usize,
}

impl Client {
    /// Connect to a server.
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        Ok(Self {
            reader: BufReader::new(stream.try_clone()?),
            writer: BufWriter::new(stream),
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        })
    }

    /// Limit the size of a single response line, snapshots included.
    ///
    /// Longer lines fail with [`RegistryError::Protocol`]. The limit carries
    /// over to the [`Subscription`] returned by [`Client::subscribe`].
    pub fn max_response_bytes(mut self, max: usize) -> Self {
        self.max_response_bytes = max.max(1);
        self
    }

    /// Connect to `KV_REGISTRY_ADDR`, or localhost on the default port.
    pub fn from_env() -> Result<Self> {
        let addr = match std::env::var(ENV_ADDR) {
            Ok(addr) => addr,
            Err(_) => SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)).to_string(),
        };
        Self::connect(addr.as_str())
    }

    /// Write a value. Empty keys or values are rejected by the server.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match self.call(&Request::Set {
            key: key.to_string(),
            value: value.to_string(),
        })? {
            Response::Ok => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Read one value.
    pub fn get(&mut self, key: &str) -> Result<Option<String>> {
        match self.call(&Request::Get {
            key: key.to_string(),
        })? {
            Response::Value { value } => Ok(Some(value)),
            Response::NotFound => Ok(None),
            other => Err(unexpected(other)),
        }
    }

    /// Read every value.
    pub fn get_all(&mut self) -> Result<Snapshot> {
        match self.call(&Request::GetAll)? {
            Response::Snapshot { entries } => Ok(entries),
            other => Err(unexpected(other)),
        }
    }

    /// Turn this connection into a notification feed.
    pub fn subscribe(mut self) -> Result<Subscription> {
        match self.call(&Request::Subscribe)? {
            Response::Subscribed => Ok(Subscription {
                reader: self.reader,
                max_line_bytes: self.max_response_bytes,
                stream: self.writer.into_inner().map_err(|e| e.into_error())?,
            }),
            other => Err(unexpected(other)),
        }
    }

    fn call(&mut self, request: &Request) -> Result<Response> {
        write_json_line(&mut self.writer, request)?;
        let line = read_line(&mut self.reader, self.max_response_bytes)?.ok_or_else(|| {
            RegistryError::Protocol("connection closed before response".to_string())
        })?;
        Ok(serde_json::from_str(&line)?)
    }
}

fn unexpected(response: Response) -> RegistryError {
    match response {
        Response::Error { message } => RegistryError::Server(message),
        other => RegistryError::Protocol(format!("unexpected response: {:?}", other)),
    }
}

/// Live feed of notifications. Dropping it disconnects.
pub struct Subscription {
    reader: BufReader<TcpStream>,
    max_line_bytes: usize,
    stream: TcpStream,
}

impl Subscription {
    /// Block for the next notification; `Ok(None)` once the server hangs up.
    pub fn next_notification(&mut self) -> Result<Option<Notification>> {
        match read_line(&mut self.reader, self.max_line_bytes)? {
            Some(line) => Ok(Some(serde_json::from_str(&line)?)),
            None => Ok(None),
        }
    }

    /// Set a read timeout for `next_notification`.
    pub fn set_read_timeout(&self, timeout: Option<std::time::Duration>) -> Result<()> {
        Ok(self.stream.set_read_timeout(timeout)?)
    }

    /// Close the connection; the server deregisters the subscriber.
    pub fn close(self) -> Result<()> {
        Ok(self.stream.shutdown(Shutdown::Both)?)
    }
}

impl Iterator for Subscription {
    type Item = Result<Notification>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_notification().transpose()
    }
}
