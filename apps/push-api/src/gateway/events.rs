//! Gateway event names, push messages, and wire-format frames.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

/// Event names used at the transport boundary.
pub struct EventName;

impl EventName {
    /// Transport lifecycle: a session came online.
    pub const CONNECT: &'static str = "connect";
    /// Transport lifecycle: a session went away.
    pub const DISCONNECT: &'static str = "disconnect";
    /// Inbound client-originated event.
    pub const CLIENT_EVENT: &'static str = "client_event";
    /// Outbound replies and periodic pushes.
    pub const SERVER_RESPONSE: &'static str = "server_response";
    /// Outbound, reserved for server-initiated notices.
    pub const SERVER_MESSAGE: &'static str = "server_message";
}

// ---------------------------------------------------------------------------
// Push message
// ---------------------------------------------------------------------------

/// Where a push message originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Emitted by the periodic scheduler.
    Timer,
    /// Emitted by the HTTP "push once" trigger.
    Manual,
    /// Emitted in response to a single session.
    Reply,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Timer => "timer",
            Source::Manual => "manual",
            Source::Reply => "reply",
        }
    }
}

/// An immutable, timestamped message pushed to one or more sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PushMessage {
    pub timestamp: String,
    pub seq: u64,
    pub source: Source,
    #[schema(value_type = Value)]
    pub message: Value,
}

impl PushMessage {
    /// Build a message stamped with the current local time.
    pub fn new(seq: u64, source: Source, message: Value) -> Self {
        Self {
            timestamp: pushcast_common::timestamp::now(),
            seq,
            source,
            message,
        }
    }
}

// ---------------------------------------------------------------------------
// Server → Client frame
// ---------------------------------------------------------------------------

/// A frame sent from the server to the client over WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerFrame {
    pub event: String,
    pub data: PushMessage,
}

impl ServerFrame {
    pub fn new(event: &str, data: PushMessage) -> Self {
        Self {
            event: event.to_string(),
            data,
        }
    }
}

// ---------------------------------------------------------------------------
// Client → Server frame
// ---------------------------------------------------------------------------

/// A frame received from the client over WebSocket.
#[derive(Debug, Deserialize)]
pub struct ClientFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}
