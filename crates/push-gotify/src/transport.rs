//! Persistent WebSocket stream to the broker.
//!
//! The transport owns the reconnect loop: after a dropped stream or a failed
//! handshake it waits `RetryPolicy::delay_for_attempt` and dials again until
//! the session is closed. Everything it observes is reported, in order, as a
//! [`TransportEvent`] on the channel handed to [`StreamTransport::open`].

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use futures_util::StreamExt;
use push_core::{Message, PushError, PushErrorCategory, RetryPolicy};
use tokio::{net::TcpStream, sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use url::Url;

/// Raw events emitted by a transport session.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Handshake completed; frames will follow.
    Connected,
    /// An established stream dropped. The transport keeps retrying.
    Disconnected { reason: String },
    /// One decoded broker message.
    Message(Message),
    /// Handshake, socket, or frame decoding failure.
    Error(PushError),
}

pub type TransportEventSender = mpsc::UnboundedSender<TransportEvent>;

/// Factory for stream sessions.
pub trait StreamTransport: Send + Sync {
    /// Start a session against `endpoint`. Must be called inside a Tokio runtime.
    fn open(&self, endpoint: Url, events: TransportEventSender) -> Box<dyn TransportSession>;
}

/// Handle to one running session.
pub trait TransportSession: Send + Sync {
    /// Whether the underlying socket is currently up.
    fn is_connected(&self) -> bool;

    /// Stop the session, including any pending reconnect.
    fn close(&self);
}

/// `StreamTransport` backed by tokio-tungstenite.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransport {
    policy: RetryPolicy,
}

impl WebSocketTransport {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }
}

impl StreamTransport for WebSocketTransport {
    fn open(&self, endpoint: Url, events: TransportEventSender) -> Box<dyn TransportSession> {
        let connected = Arc::new(AtomicBool::new(false));
        let stop = CancellationToken::new();
        let task = tokio::spawn(run_stream(
            endpoint,
            self.policy,
            events,
            connected.clone(),
            stop.child_token(),
        ));

        Box::new(WebSocketSession {
            connected,
            stop,
            _task: task,
        })
    }
}

#[derive(Debug)]
struct WebSocketSession {
    connected: Arc<AtomicBool>,
    stop: CancellationToken,
    _task: JoinHandle<()>,
}

impl TransportSession for WebSocketSession {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.stop.cancel();
        self.connected.store(false, Ordering::SeqCst);
    }
}

impl Drop for WebSocketSession {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

type BrokerSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn run_stream(
    endpoint: Url,
    policy: RetryPolicy,
    events: TransportEventSender,
    connected: Arc<AtomicBool>,
    stop: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        let handshake = tokio::select! {
            _ = stop.cancelled() => break,
            result = connect_async(endpoint.as_str()) => result,
        };

        match handshake {
            Ok((socket, _response)) => {
                attempt = 0;
                connected.store(true, Ordering::SeqCst);
                let _ = events.send(TransportEvent::Connected);

                let reason = read_frames(socket, &events, &stop).await;
                connected.store(false, Ordering::SeqCst);
                if stop.is_cancelled() {
                    break;
                }
                let _ = events.send(TransportEvent::Disconnected { reason });
            }
            Err(err) => {
                let _ = events.send(TransportEvent::Error(map_ws_error(err, "stream handshake")));
            }
        }

        if !policy.allows_attempt(attempt) {
            debug!(attempt, "stream reconnect budget exhausted");
            break;
        }
        let delay = policy.delay_for_attempt(attempt);
        attempt = attempt.saturating_add(1);
        debug!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            "scheduling stream reconnect"
        );

        tokio::select! {
            _ = stop.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    connected.store(false, Ordering::SeqCst);
    trace!("stream task exited");
}

/// Pump frames until the stream ends; returns the disconnect reason.
async fn read_frames(
    mut socket: BrokerSocket,
    events: &TransportEventSender,
    stop: &CancellationToken,
) -> String {
    loop {
        let frame = tokio::select! {
            _ = stop.cancelled() => {
                let _ = socket.close(None).await;
                return "client disconnect".to_owned();
            }
            frame = socket.next() => frame,
        };

        match frame {
            Some(Ok(WsMessage::Text(text))) => {
                let event = match serde_json::from_str::<Message>(&text) {
                    Ok(message) => TransportEvent::Message(message),
                    Err(err) => TransportEvent::Error(PushError::new(
                        PushErrorCategory::Serialization,
                        "invalid_frame",
                        format!("undecodable broker frame: {err}"),
                    )),
                };
                let _ = events.send(event);
            }
            Some(Ok(WsMessage::Close(frame))) => {
                return frame
                    .map(|frame| frame.reason.to_string())
                    .filter(|reason| !reason.is_empty())
                    .unwrap_or_else(|| "server closed stream".to_owned());
            }
            Some(Ok(_)) => {}
            Some(Err(err)) => {
                let mapped = map_ws_error(err, "stream read");
                let reason = mapped.message.clone();
                let _ = events.send(TransportEvent::Error(mapped));
                return reason;
            }
            None => return "stream ended".to_owned(),
        }
    }
}

fn map_ws_error(err: WsError, operation: &str) -> PushError {
    match err {
        WsError::Http(response) => PushError::http_status(response.status().as_u16(), operation),
        WsError::Url(err) => PushError::new(
            PushErrorCategory::Config,
            "invalid_stream_url",
            format!("{operation}: {err}"),
        ),
        other => PushError::new(
            PushErrorCategory::Network,
            "stream_transport_error",
            format!("{operation}: {other}"),
        ),
    }
}
