//! Broadcast hub — fan-out channel between task publishers and connected
//! human clients.
//!
//! Transport is newline-delimited UTF-8 text over TCP. Frames are opaque to
//! the hub: it owns connectivity, never task state. Publishers are just
//! writers that may connect, send one line, and disconnect; every other
//! currently-connected client receives the line verbatim. There is no
//! per-recipient routing — any connected consumer sees all tasks.

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::{Framed, LinesCodec};
use tokio_util::sync::CancellationToken;

use crate::types::{Error, Result};

/// Cap on one text frame.
const MAX_LINE_BYTES: usize = 64 * 1024;

/// Outbound queue depth per connection. A consumer that cannot drain this
/// many pending messages is treated as a failed writer and dropped.
const CONN_QUEUE_DEPTH: usize = 32;

/// The message publishers and consumers exchange through the hub. The hub
/// itself never decodes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubMessage {
    pub task_id: String,
    pub prompt: String,
}

/// Connection set and fan-out logic. All mutation goes through `register`,
/// `unregister`, and `broadcast`; the lock is never held across an await.
#[derive(Debug, Default)]
pub struct BroadcastHub {
    connections: Mutex<HashMap<u64, mpsc::Sender<String>>>,
    next_id: AtomicU64,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// A poisoned lock only means another task panicked mid-mutation of the
    /// map; the map itself stays usable.
    fn connections(&self) -> std::sync::MutexGuard<'_, HashMap<u64, mpsc::Sender<String>>> {
        self.connections.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a connection to the live set. Returns its id and the queue the
    /// connection task drains into its socket.
    pub fn register(&self) -> (u64, mpsc::Receiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(CONN_QUEUE_DEPTH);
        self.connections().insert(id, tx);
        tracing::info!(conn = id, "client registered");
        (id, rx)
    }

    /// Remove a connection from the live set. Idempotent: removing an
    /// already-absent connection is a no-op.
    pub fn unregister(&self, id: u64) {
        let removed = self.connections().remove(&id).is_some();
        if removed {
            tracing::info!(conn = id, "client unregistered");
        }
    }

    /// Queue `message` for every registered connection except the
    /// originator. Connections whose queue rejects the write are collected
    /// during iteration and removed once afterwards, so the set is never
    /// mutated while being walked. Returns the delivery count.
    pub fn broadcast(&self, origin: Option<u64>, message: &str) -> usize {
        let mut connections = self.connections();
        tracing::debug!(clients = connections.len(), "broadcasting message");

        let mut delivered = 0;
        let mut failed = Vec::new();
        for (&id, tx) in connections.iter() {
            if origin == Some(id) {
                continue;
            }
            match tx.try_send(message.to_string()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(conn = id, error = %e, "write failed, scheduling unregister");
                    failed.push(id);
                }
            }
        }
        for id in failed {
            connections.remove(&id);
        }
        delivered
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.connections().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Accept connections on `listener` and pump them until cancelled.
pub async fn serve(
    hub: std::sync::Arc<BroadcastHub>,
    listener: TcpListener,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    tracing::info!(addr = %listener.local_addr()?, "broadcast hub listening");
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("broadcast hub shutting down");
                break;
            }
            accept = listener.accept() => {
                let (stream, peer) = accept?;
                tracing::debug!(%peer, "hub connection accepted");
                let hub = hub.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    handle_connection(hub, stream, cancel).await;
                });
            }
        }
    }
    Ok(())
}

/// One connection: inbound lines are re-broadcast to everyone else,
/// outbound queue entries are written to the socket. Any socket error ends
/// the connection and unregisters it.
async fn handle_connection(
    hub: std::sync::Arc<BroadcastHub>,
    stream: TcpStream,
    cancel: CancellationToken,
) {
    let (id, mut queue) = hub.register();
    let framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_BYTES));
    let (mut sink, mut lines) = framed.split();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            inbound = lines.next() => {
                match inbound {
                    Some(Ok(line)) => {
                        hub.broadcast(Some(id), &line);
                    }
                    Some(Err(e)) => {
                        tracing::warn!(conn = id, error = %e, "hub read error");
                        break;
                    }
                    None => break, // clean close
                }
            }
            outbound = queue.recv() => {
                match outbound {
                    Some(message) => {
                        if let Err(e) = sink.send(message).await {
                            tracing::warn!(conn = id, error = %e, "hub write error");
                            break;
                        }
                    }
                    // Sender side dropped: this connection was already
                    // unregistered by a failed broadcast.
                    None => break,
                }
            }
        }
    }

    hub.unregister(id);
}

/// Fire-and-forget publisher used by the human-input tool: open a
/// connection, send one message, close. Delivery to any particular human
/// client is not confirmed.
#[derive(Debug, Clone)]
pub struct HubPublisher {
    addr: String,
}

impl HubPublisher {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    pub async fn publish(&self, message: &HubMessage) -> Result<()> {
        let stream = TcpStream::connect(&self.addr).await?;
        let mut framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_BYTES));
        let line = serde_json::to_string(message)?;
        framed
            .send(line)
            .await
            .map_err(|e| Error::internal(format!("hub publish failed: {}", e)))?;
        Ok(())
    }
}
