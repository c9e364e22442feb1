#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use futures_util::{SinkExt, StreamExt};
use tokio::time;
use tokio_tungstenite::tungstenite::Message;

use push_api::config::Config;
use push_api::AppState;

pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Config with a push interval long enough that no timer push lands mid-test.
pub fn quiet_config() -> Config {
    Config {
        push_interval: Duration::from_secs(3600),
        send_timeout: Duration::from_millis(500),
        ..Config::default()
    }
}

/// Build the full application router wired to a fresh state.
pub fn test_app(config: Config) -> (Router, AppState) {
    let state = AppState::new(config);
    let app = push_api::routes::router().with_state(state.clone());
    (app, state)
}

/// Start an actual TCP server for WebSocket testing. The server runs in the
/// background.
pub async fn start_ws_server(config: Config) -> (SocketAddr, AppState) {
    let (app, state) = test_app(config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, state)
}

/// Connect to the gateway and consume the welcome frame.
/// Returns the stream and the session ID the server assigned.
pub async fn connect(addr: SocketAddr) -> (WsStream, String) {
    let url = format!("ws://{addr}/ws");
    let (mut ws, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("ws connect");

    let welcome = next_json(&mut ws).await;
    assert_eq!(welcome["event"], "server_response");
    assert_eq!(welcome["data"]["source"], "reply");

    let text = welcome["data"]["message"].as_str().expect("welcome text");
    let session_id = text
        .strip_prefix("Welcome! Your Session ID is ")
        .expect("welcome prefix")
        .to_string();

    (ws, session_id)
}

/// Send a `{"event", "data"}` frame.
pub async fn emit(ws: &mut WsStream, event: &str, data: serde_json::Value) {
    let frame = serde_json::json!({ "event": event, "data": data });
    ws.send(Message::Text(frame.to_string().into()))
        .await
        .expect("send frame");
}

/// Read the next text frame as JSON, skipping pings.
pub async fn next_json(ws: &mut WsStream) -> serde_json::Value {
    loop {
        let msg = time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timeout waiting for frame")
            .expect("stream ended")
            .expect("ws read error");

        match msg {
            Message::Text(text) => return serde_json::from_str(&text).expect("parse frame"),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("Expected text frame, got: {other:?}"),
        }
    }
}

/// Assert nothing arrives on the socket for `window`.
pub async fn expect_silence(ws: &mut WsStream, window: Duration) {
    if let Ok(msg) = time::timeout(window, ws.next()).await {
        panic!("Expected no frame, got: {msg:?}");
    }
}

/// Poll until the registry reaches `expected` sessions.
pub async fn wait_for_sessions(state: &AppState, expected: usize) {
    let deadline = time::Instant::now() + Duration::from_secs(5);
    while state.gateway.registry().len() != expected {
        assert!(
            time::Instant::now() < deadline,
            "registry stuck at {} sessions, expected {expected}",
            state.gateway.registry().len()
        );
        time::sleep(Duration::from_millis(20)).await;
    }
}
