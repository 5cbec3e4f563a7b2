//! Subscriber connections.
//!
//! A subscriber is a bidirectional byte stream. Its write side gets one JSON
//! notification per line from a dedicated delivery thread; its read side is
//! drained and ignored until it closes, which is the only signal that the
//! subscriber has gone away.

use crate::error::Result;
use crate::registry::KvRegistry;
use crate::subscriptions::SubscriptionHandle;
use crate::types::SubscriberId;
use std::io::{self, ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Write side of a subscriber connection.
pub trait SubscriberStream: Write + Send + 'static {
    /// Tear down the transport so the connection's read loop wakes up.
    ///
    /// Called by the delivery thread after a failed write, or once the
    /// registry has dropped the subscriber on its own.
    fn close(&mut self) {}
}

impl SubscriberStream for TcpStream {
    fn close(&mut self) {
        let _ = self.shutdown(Shutdown::Both);
    }
}

/// Why a subscriber connection ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Disconnect {
    /// The peer closed its side of the stream.
    Closed,
    /// Reading from the peer failed.
    ReadError(String),
}

/// Summary of a finished subscriber connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscriberSummary {
    pub id: SubscriberId,
    /// Frames written to the stream.
    pub delivered: u64,
    /// Set if the delivery thread stopped because a write failed.
    pub write_error: Option<String>,
    /// The registry removed the subscriber before the connection closed.
    pub evicted: bool,
    pub disconnect: Disconnect,
}

/// What the delivery thread reports back.
#[derive(Default)]
struct DeliveryOutcome {
    delivered: u64,
    write_error: Option<String>,
    evicted: bool,
}

/// Register a subscriber and serve it until its read side closes.
pub fn serve_subscriber<R, W>(
    registry: &KvRegistry,
    reader: R,
    writer: W,
) -> Result<SubscriberSummary>
where
    R: Read,
    W: SubscriberStream,
{
    serve_subscription(registry, registry.subscribe(), reader, writer)
}

/// Serve an already registered subscriber until its read side closes.
///
/// Spawns the delivery thread for `handle`, drains `reader`, then
/// deregisters and waits for the delivery thread to finish. Removal happens
/// exactly once here no matter how the connection ends.
///
/// Registering before this call lets the caller acknowledge the
/// subscription knowing every later write will be delivered.
pub fn serve_subscription<R, W>(
    registry: &KvRegistry,
    handle: SubscriptionHandle,
    reader: R,
    writer: W,
) -> Result<SubscriberSummary>
where
    R: Read,
    W: SubscriberStream,
{
    let id = handle.id();
    let closing = Arc::new(AtomicBool::new(false));

    let delivery = {
        let closing = Arc::clone(&closing);
        match thread::Builder::new()
            .name(format!("kv-subscriber-{}", id))
            .spawn(move || deliver(handle, writer, &closing))
        {
            Ok(delivery) => delivery,
            Err(e) => {
                registry.unsubscribe(id);
                return Err(e.into());
            }
        }
    };

    tracing::debug!(subscriber = %id, "Subscriber connected");

    let disconnect = drain(reader);
    closing.store(true, Ordering::Release);
    registry.unsubscribe(id);

    let outcome = delivery.join().unwrap_or_else(|_| DeliveryOutcome {
        write_error: Some("delivery thread panicked".to_string()),
        ..DeliveryOutcome::default()
    });

    tracing::debug!(
        subscriber = %id,
        delivered = outcome.delivered,
        evicted = outcome.evicted,
        disconnect = ?disconnect,
        "Subscriber disconnected"
    );

    Ok(SubscriberSummary {
        id,
        delivered: outcome.delivered,
        write_error: outcome.write_error,
        evicted: outcome.evicted,
        disconnect,
    })
}

/// Write queued frames until the queue closes or a write fails.
fn deliver<W: SubscriberStream>(
    handle: SubscriptionHandle,
    mut writer: W,
    closing: &AtomicBool,
) -> DeliveryOutcome {
    let mut outcome = DeliveryOutcome::default();

    for frame in handle.iter() {
        if let Err(e) = write_frame(&mut writer, frame.as_bytes()) {
            tracing::debug!(subscriber = %handle.id(), error = %e, "Notification write failed");
            // Dropping the handle lets the next broadcast prune us; closing
            // the stream ends the read loop.
            writer.close();
            outcome.write_error = Some(e.to_string());
            return outcome;
        }
        outcome.delivered += 1;
    }

    // Queue closed without the connection tearing down: the registry dropped us
    if !closing.load(Ordering::Acquire) {
        tracing::debug!(subscriber = %handle.id(), "Subscriber evicted, closing stream");
        writer.close();
        outcome.evicted = true;
    }

    outcome
}

fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    let mut line = Vec::with_capacity(payload.len() + 1);
    line.extend_from_slice(payload);
    line.push(b'\n');
    writer.write_all(&line)?;
    writer.flush()
}

/// Read and discard until end of stream.
fn drain<R: Read>(mut reader: R) -> Disconnect {
    let mut buf = [0u8; 1024];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => return Disconnect::Closed,
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Disconnect::ReadError(e.to_string()),
        }
    }
}
