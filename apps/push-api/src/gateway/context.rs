//! The gateway context: one long-lived object owning the session registry,
//! the broadcast engine, the push scheduler, and the event router.

use std::sync::Arc;

use serde_json::Value;

use crate::config::Config;

use super::events::{EventName, PushMessage, Source};
use super::fanout::{BroadcastReport, Broadcaster};
use super::handler::EventRouter;
use super::registry::SessionRegistry;
use super::scheduler::{PushScheduler, SchedulerState};
use super::sequence::Sequencer;
use super::transport::Transport;

pub struct Gateway {
    registry: Arc<SessionRegistry>,
    broadcaster: Arc<Broadcaster>,
    sequencer: Arc<Sequencer>,
    scheduler: PushScheduler,
    router: EventRouter,
}

impl Gateway {
    /// Gateway with the default event handlers.
    pub fn new(config: &Config, transport: Arc<dyn Transport>) -> Self {
        Self::with_router(config, transport, EventRouter::with_defaults())
    }

    pub fn with_router(config: &Config, transport: Arc<dyn Transport>, router: EventRouter) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let broadcaster = Arc::new(Broadcaster::new(registry.clone(), transport));
        let sequencer = Arc::new(Sequencer::new());
        let scheduler =
            PushScheduler::new(config.push_interval, broadcaster.clone(), sequencer.clone());

        Self {
            registry,
            broadcaster,
            sequencer,
            scheduler,
            router,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    // -----------------------------------------------------------------------
    // Transport notifications
    // -----------------------------------------------------------------------

    /// A session connected: register it, make sure the push loop runs, and
    /// greet it with its own ID.
    pub async fn on_connect(&self, session_id: &str) {
        if !self.registry.add(session_id) {
            tracing::warn!(%session_id, "connect for a session that is already registered");
        }
        if self.scheduler.start() {
            tracing::debug!(%session_id, "first connection started the push scheduler");
        }

        tracing::info!(%session_id, sessions = self.registry.len(), "session connected");

        self.reply(
            session_id,
            Value::String(format!("Welcome! Your Session ID is {session_id}")),
        )
        .await;
    }

    pub async fn on_disconnect(&self, session_id: &str) {
        self.registry.remove(session_id);
        tracing::info!(%session_id, sessions = self.registry.len(), "session disconnected");
    }

    /// Route a client event to its handler. Returns `false` if no handler is
    /// registered for `event`.
    pub async fn on_client_event(&self, session_id: &str, event: &str, payload: Value) -> bool {
        let Some(handler) = self.router.handler(event) else {
            tracing::debug!(%session_id, event, "dropping event with no handler");
            return false;
        };
        handler.handle(self, session_id, payload).await;
        true
    }

    // -----------------------------------------------------------------------
    // Outbound helpers
    // -----------------------------------------------------------------------

    /// Unicast a reply-tagged message on `server_response`.
    pub async fn reply(&self, session_id: &str, message: Value) -> bool {
        let message = self.sequencer.next_message(Source::Reply, |_| message);
        self.broadcaster
            .send_to(session_id, EventName::SERVER_RESPONSE, &message)
            .await
    }

    /// Broadcast a manually triggered message to every session.
    pub async fn push_manual(&self) -> (PushMessage, BroadcastReport) {
        let message = self.sequencer.next_message(Source::Manual, |seq| {
            Value::String(format!("Manual HTTP Trigger Push #{seq}"))
        });
        let report = self
            .broadcaster
            .broadcast(EventName::SERVER_RESPONSE, &message)
            .await;

        tracing::info!(
            source = message.source.as_str(),
            seq = message.seq,
            recipients = report.recipients,
            delivered = report.delivered,
            "manual push"
        );
        (message, report)
    }

    /// Stop the push scheduler. Sessions stay registered until their
    /// connections close.
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::gateway::handler::EventHandler;
    use crate::gateway::transport::MemoryTransport;

    fn setup() -> (Arc<MemoryTransport>, Gateway) {
        let transport = Arc::new(MemoryTransport::new());
        let gateway = Gateway::new(&Config::default(), transport.clone());
        (transport, gateway)
    }

    #[tokio::test]
    async fn connect_and_disconnect_scenario() {
        let (transport, gateway) = setup();

        gateway.on_connect("A").await;
        assert!(gateway.registry().contains("A"));
        assert_eq!(gateway.registry().len(), 1);

        gateway.on_connect("B").await;
        assert_eq!(gateway.registry().len(), 2);

        gateway.on_disconnect("A").await;
        assert!(!gateway.registry().contains("A"));
        assert!(gateway.registry().contains("B"));

        transport.clear();
        let message = gateway
            .sequencer()
            .next_message(Source::Manual, |_| Value::String("hello".into()));
        let report = gateway
            .broadcaster()
            .broadcast(EventName::SERVER_RESPONSE, &message)
            .await;

        assert_eq!(report.delivered, 1);
        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "B");
        assert_eq!(sent[0].1.data.message, "hello");

        gateway.shutdown().await;
    }

    #[tokio::test]
    async fn connect_starts_scheduler_and_sends_welcome() {
        let (transport, gateway) = setup();
        assert_eq!(gateway.scheduler_state(), SchedulerState::NotStarted);

        gateway.on_connect("sid_1").await;
        assert_eq!(gateway.scheduler_state(), SchedulerState::Running);

        let welcome = transport.sent_to("sid_1");
        assert_eq!(welcome.len(), 1);
        assert_eq!(welcome[0].event, EventName::SERVER_RESPONSE);
        assert_eq!(welcome[0].data.source, Source::Reply);
        assert_eq!(welcome[0].data.message, "Welcome! Your Session ID is sid_1");

        gateway.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn simultaneous_first_connects_start_one_scheduler() {
        let (_transport, gateway) = setup();
        let gateway = Arc::new(gateway);

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let gateway = gateway.clone();
                tokio::spawn(async move { gateway.on_connect(&format!("s{i}")).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(gateway.registry().len(), 16);
        assert_eq!(gateway.scheduler_state(), SchedulerState::Running);
        // A second explicit start is refused: the task already exists.
        assert!(!gateway.scheduler.start());

        gateway.shutdown().await;
    }

    #[tokio::test]
    async fn client_event_replies_to_sender_only() {
        let (transport, gateway) = setup();
        gateway.on_connect("C").await;
        gateway.on_connect("D").await;
        transport.clear();

        let handled = gateway
            .on_client_event("C", EventName::CLIENT_EVENT, serde_json::json!({"data": "ping"}))
            .await;
        assert!(handled);

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "C");
        let reply = &sent[0].1.data;
        assert_eq!(reply.source, Source::Reply);
        assert_eq!(reply.message["data"], "Server received message from C");
        assert_eq!(reply.message["echo"]["data"], "ping");

        gateway.shutdown().await;
    }

    #[tokio::test]
    async fn unknown_event_is_dropped() {
        let (transport, gateway) = setup();
        gateway.on_connect("C").await;
        transport.clear();

        let handled = gateway
            .on_client_event("C", "no_such_event", serde_json::json!(1))
            .await;
        assert!(!handled);
        assert!(transport.sent().is_empty());

        gateway.shutdown().await;
    }

    #[tokio::test]
    async fn disconnect_of_unknown_session_is_a_noop() {
        let (_transport, gateway) = setup();
        gateway.on_connect("A").await;
        gateway.on_disconnect("never").await;
        gateway.on_disconnect("A").await;
        gateway.on_disconnect("A").await;
        assert!(gateway.registry().is_empty());

        gateway.shutdown().await;
    }

    #[tokio::test]
    async fn custom_handlers_receive_session_and_payload() {
        struct Capture(Arc<Mutex<Vec<(String, Value)>>>);

        #[async_trait]
        impl EventHandler for Capture {
            async fn handle(&self, _gateway: &Gateway, session_id: &str, payload: Value) {
                self.0.lock().push((session_id.to_string(), payload));
            }
        }

        let seen = Arc::new(Mutex::new(Vec::new()));
        let transport = Arc::new(MemoryTransport::new());
        let router = EventRouter::new().on("typing", Capture(seen.clone()));
        let gateway = Gateway::with_router(&Config::default(), transport, router);

        assert!(gateway.on_client_event("s1", "typing", serde_json::json!({"on": true})).await);
        // No default handlers on a bare router.
        assert!(!gateway.on_client_event("s1", EventName::CLIENT_EVENT, Value::Null).await);

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "s1");
        assert_eq!(seen[0].1["on"], true);
    }

    #[tokio::test]
    async fn manual_push_uses_its_own_sequence() {
        let (transport, gateway) = setup();
        gateway.on_connect("A").await;
        transport.clear();

        let (first, report) = gateway.push_manual().await;
        let (second, _) = gateway.push_manual().await;

        assert_eq!(report.recipients, 1);
        assert_eq!(first.seq, 1);
        assert_eq!(second.seq, 2);
        assert_eq!(first.source, Source::Manual);
        assert_eq!(first.message, "Manual HTTP Trigger Push #1");
        assert_eq!(transport.sent_to("A").len(), 2);

        gateway.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn timer_pushes_reach_connected_sessions() {
        let transport = Arc::new(MemoryTransport::new());
        let config = Config {
            push_interval: Duration::from_secs(5),
            ..Config::default()
        };
        let gateway = Gateway::new(&config, transport.clone());

        gateway.on_connect("A").await;
        transport.clear();
        tokio::time::sleep(Duration::from_secs(11)).await;

        let timer: Vec<u64> = transport
            .sent_to("A")
            .iter()
            .filter(|f| f.data.source == Source::Timer)
            .map(|f| f.data.seq)
            .collect();
        assert_eq!(timer, vec![1, 2]);

        gateway.shutdown().await;
    }
}
