pub mod context;
pub mod events;
pub mod fanout;
pub mod handler;
pub mod registry;
pub mod scheduler;
pub mod sequence;
pub mod server;
pub mod transport;

pub use context::Gateway;
