//! Connection transport: the per-session outbound side of the gateway.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time;

use super::events::ServerFrame;
use super::registry::SessionId;

/// Why a single delivery did not reach its session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("session {0} is not connected")]
    NotConnected(SessionId),
    #[error("connection closed")]
    Closed,
    #[error("send timed out after {0:?}")]
    TimedOut(Duration),
}

/// Outbound primitive used by the broadcast engine.
///
/// Backed by WebSocket connections in production and an in-memory recorder in
/// tests.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, session_id: &str, frame: Arc<ServerFrame>) -> Result<(), DeliveryError>;
}

// ---------------------------------------------------------------------------
// WebSocket implementation
// ---------------------------------------------------------------------------

/// Item queued for a connection's writer task.
#[derive(Debug, Clone)]
pub enum Outbound {
    Frame(Arc<ServerFrame>),
    Close { code: u16, reason: &'static str },
}

/// Routes frames to live WebSocket connections through bounded queues.
///
/// Each connection owns a writer task draining its queue into the socket, so
/// a slow client only ever fills its own queue.
pub struct WsTransport {
    connections: DashMap<SessionId, mpsc::Sender<Outbound>>,
    send_timeout: Duration,
    buffer: usize,
}

impl WsTransport {
    pub fn new(send_timeout: Duration, buffer: usize) -> Self {
        Self {
            connections: DashMap::new(),
            send_timeout,
            buffer: buffer.max(1),
        }
    }

    /// Open an outbound queue for a new connection. The caller hands the
    /// receiver to the connection's writer task.
    pub fn attach(&self, session_id: &str) -> mpsc::Receiver<Outbound> {
        let (tx, rx) = mpsc::channel(self.buffer);
        self.connections.insert(session_id.to_string(), tx);
        rx
    }

    /// Drop the outbound queue. The writer exits once the queue drains.
    pub fn detach(&self, session_id: &str) {
        self.connections.remove(session_id);
    }

    /// Ask the writer to send a close frame and stop.
    pub async fn close(
        &self,
        session_id: &str,
        code: u16,
        reason: &'static str,
    ) -> Result<(), DeliveryError> {
        self.enqueue(session_id, Outbound::Close { code, reason }).await
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    async fn enqueue(&self, session_id: &str, item: Outbound) -> Result<(), DeliveryError> {
        // Clone the sender so no DashMap guard is held across the await.
        let tx = self
            .connections
            .get(session_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| DeliveryError::NotConnected(session_id.to_string()))?;

        match time::timeout(self.send_timeout, tx.send(item)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(DeliveryError::Closed),
            Err(_) => Err(DeliveryError::TimedOut(self.send_timeout)),
        }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&self, session_id: &str, frame: Arc<ServerFrame>) -> Result<(), DeliveryError> {
        self.enqueue(session_id, Outbound::Frame(frame)).await
    }
}

// ---------------------------------------------------------------------------
// In-memory implementation (for tests)
// ---------------------------------------------------------------------------

/// Records every frame instead of writing it anywhere.
#[derive(Default)]
pub struct MemoryTransport {
    sent: Mutex<Vec<(SessionId, Arc<ServerFrame>)>>,
    unreachable: Mutex<Vec<SessionId>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later send to this session fail as if its socket vanished.
    pub fn make_unreachable(&self, session_id: &str) {
        self.unreachable.lock().push(session_id.to_string());
    }

    /// All recorded `(session, frame)` pairs, in send order.
    pub fn sent(&self) -> Vec<(SessionId, Arc<ServerFrame>)> {
        self.sent.lock().clone()
    }

    /// Frames recorded for one session.
    pub fn sent_to(&self, session_id: &str) -> Vec<Arc<ServerFrame>> {
        self.sent
            .lock()
            .iter()
            .filter(|(id, _)| id == session_id)
            .map(|(_, frame)| frame.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, session_id: &str, frame: Arc<ServerFrame>) -> Result<(), DeliveryError> {
        if self.unreachable.lock().iter().any(|id| id == session_id) {
            return Err(DeliveryError::Closed);
        }
        self.sent.lock().push((session_id.to_string(), frame));
        Ok(())
    }
}
