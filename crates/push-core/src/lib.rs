//! Core contract of the push-notification client.
//!
//! This crate defines the broker message model, the connection lifecycle,
//! reconnect backoff, priority routing, and the notification-channel registry
//! shared by transport bindings and the application layer.

/// Notification channel registry.
pub mod channels;
/// Stable error types and HTTP classification helpers.
pub mod error;
/// Seam to the device's local-notification subsystem.
pub mod notifier;
/// Backoff policy used by the reconnect loop.
pub mod retry;
/// Priority to channel routing.
pub mod routing;
/// Connection lifecycle state machine.
pub mod state_machine;
/// Wire and presentation types.
pub mod types;

pub use channels::{
    CHANNELS, CRITICAL_CHANNEL_ID, DEFAULT_CHANNEL_ID, NORMAL_CHANNEL_ID, channel, setup_channels,
};
pub use error::{NotifierError, PushError, PushErrorCategory, classify_http_status};
pub use notifier::Notifier;
pub use retry::RetryPolicy;
pub use routing::route;
pub use state_machine::ConnectionStateMachine;
pub use types::{ConnectionState, DisplayRequest, Importance, Message, NotificationChannel, Route};
