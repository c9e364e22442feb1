pub mod config;
pub mod error;
pub mod gateway;
pub mod routes;

use std::sync::Arc;

use config::Config;
use gateway::transport::WsTransport;
use gateway::Gateway;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gateway: Arc<Gateway>,
    pub transport: Arc<WsTransport>,
}

impl AppState {
    /// Wire a gateway to a fresh WebSocket transport.
    pub fn new(config: Config) -> Self {
        let transport = Arc::new(WsTransport::new(config.send_timeout, config.outbound_buffer));
        let gateway = Arc::new(Gateway::new(&config, transport.clone()));
        Self {
            config: Arc::new(config),
            gateway,
            transport,
        }
    }
}
