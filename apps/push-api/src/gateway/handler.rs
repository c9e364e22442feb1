//! Inbound event dispatch: a name → handler table built at startup.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::context::Gateway;
use super::events::EventName;

/// Reacts to one named client event.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, gateway: &Gateway, session_id: &str, payload: Value);
}

/// Maps inbound event names to their handlers.
#[derive(Clone, Default)]
pub struct EventRouter {
    handlers: HashMap<String, Arc<dyn EventHandler>>,
}

impl EventRouter {
    /// An empty router. Every event is dropped.
    pub fn new() -> Self {
        Self::default()
    }

    /// Router with the built-in `client_event` acknowledgement.
    pub fn with_defaults() -> Self {
        Self::new().on(EventName::CLIENT_EVENT, AckHandler)
    }

    /// Register (or replace) the handler for an event name.
    pub fn on(mut self, event: impl Into<String>, handler: impl EventHandler + 'static) -> Self {
        self.handlers.insert(event.into(), Arc::new(handler));
        self
    }

    pub fn handler(&self, event: &str) -> Option<Arc<dyn EventHandler>> {
        self.handlers.get(event).cloned()
    }

    #[cfg(test)]
    fn is_registered(&self, event: &str) -> bool {
        self.handlers.contains_key(event)
    }
}

/// Replies to the sender only, echoing what it sent.
pub struct AckHandler;

#[async_trait]
impl EventHandler for AckHandler {
    async fn handle(&self, gateway: &Gateway, session_id: &str, payload: Value) {
        tracing::info!(%session_id, %payload, "client event received");

        let ack = serde_json::json!({
            "data": format!("Server received message from {session_id}"),
            "echo": payload,
        });
        gateway.reply(session_id, ack).await;
    }
}
