//! Unicast and broadcast delivery to registered sessions.
//!
//! Broadcast iterates a registry snapshot and sends to every member
//! concurrently. Each send is bounded by the transport, so one stuck session
//! cannot hold up the rest. Failures are logged and counted, never returned.

use std::sync::Arc;

use futures_util::future::join_all;

use super::events::{PushMessage, ServerFrame};
use super::registry::SessionRegistry;
use super::transport::Transport;

/// Outcome of a broadcast, for logging and HTTP responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BroadcastReport {
    /// Sessions in the snapshot the broadcast was sent to.
    pub recipients: usize,
    /// Sessions whose transport accepted the frame.
    pub delivered: usize,
}

/// Delivers push messages through a [`Transport`], gated by the registry.
pub struct Broadcaster {
    registry: Arc<SessionRegistry>,
    transport: Arc<dyn Transport>,
}

impl Broadcaster {
    pub fn new(registry: Arc<SessionRegistry>, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            transport,
        }
    }

    /// Send to exactly one session. Returns `false` if the session is gone or
    /// the transport refused the frame.
    pub async fn send_to(&self, session_id: &str, event: &str, message: &PushMessage) -> bool {
        let frame = Arc::new(ServerFrame::new(event, message.clone()));
        self.deliver(session_id, frame).await
    }

    /// Send to every session registered at the time of the call.
    pub async fn broadcast(&self, event: &str, message: &PushMessage) -> BroadcastReport {
        let snapshot = self.registry.snapshot();
        if snapshot.is_empty() {
            return BroadcastReport::default();
        }

        let frame = Arc::new(ServerFrame::new(event, message.clone()));
        let results = join_all(
            snapshot
                .iter()
                .map(|session_id| self.deliver(session_id, frame.clone())),
        )
        .await;

        let report = BroadcastReport {
            recipients: snapshot.len(),
            delivered: results.into_iter().filter(|ok| *ok).count(),
        };

        if report.delivered < report.recipients {
            tracing::debug!(
                event,
                source = message.source.as_str(),
                seq = message.seq,
                recipients = report.recipients,
                delivered = report.delivered,
                "broadcast partially delivered"
            );
        }

        report
    }

    async fn deliver(&self, session_id: &str, frame: Arc<ServerFrame>) -> bool {
        // Disconnects can land at any time; a vanished session is not a fault.
        if !self.registry.contains(session_id) {
            tracing::debug!(%session_id, event = %frame.event, "skipping send to departed session");
            return false;
        }

        match self.transport.send(session_id, frame).await {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(%session_id, %err, "delivery failed");
                false
            }
        }
    }
}
