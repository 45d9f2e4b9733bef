//! Gotify-style broker bindings for the push client.
//!
//! [`PushConnection`] keeps one reconnecting WebSocket stream per process and
//! fans every inbound message out through the [`MessageDispatcher`].
//! [`HistoryClient`] wraps the broker's message-store REST endpoints.

/// Broker URL and client tuning.
pub mod config;
/// Connection manager owning the stream lifecycle.
pub mod connection;
/// Handler invocation and local-notification rendering.
pub mod dispatcher;
/// REST message-store client.
pub mod history;
/// WebSocket transport with built-in reconnect.
pub mod transport;

pub use config::ClientConfig;
pub use connection::PushConnection;
pub use dispatcher::{MessageDispatcher, NotificationHandler};
pub use history::{AUTH_HEADER, HistoryClient};
pub use transport::{
    StreamTransport, TransportEvent, TransportEventSender, TransportSession, WebSocketTransport,
};
