use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use push_core::{ConnectionState, ConnectionStateMachine, Message, Notifier};
use tokio::{
    runtime::Handle,
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    config::ClientConfig,
    dispatcher::MessageDispatcher,
    history::HistoryClient,
    transport::{StreamTransport, TransportEvent, TransportSession, WebSocketTransport},
};

/// Connection manager for the broker stream.
///
/// Construct one per process at the composition root and reuse it across
/// login/logout cycles. `connect` and `disconnect` are idempotent with
/// respect to the current state; reconnection after a dropped stream is left
/// to the transport.
pub struct PushConnection {
    config: ClientConfig,
    transport: Arc<dyn StreamTransport>,
    shared: Arc<Shared>,
}

struct Shared {
    dispatcher: MessageDispatcher,
    inner: Mutex<ConnectionInner>,
    state_tx: watch::Sender<ConnectionState>,
}

#[derive(Default)]
struct ConnectionInner {
    machine: ConnectionStateMachine,
    token: Option<String>,
    active: Option<ActiveStream>,
}

struct ActiveStream {
    session: Box<dyn TransportSession>,
    stop: CancellationToken,
    _pump: JoinHandle<()>,
}

impl PushConnection {
    /// Manager backed by the WebSocket transport.
    pub fn new(config: ClientConfig, notifier: Arc<dyn Notifier>) -> Self {
        let transport = Arc::new(WebSocketTransport::new(config.reconnect));
        Self::with_transport(config, notifier, transport)
    }

    pub fn with_transport(
        config: ClientConfig,
        notifier: Arc<dyn Notifier>,
        transport: Arc<dyn StreamTransport>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            config,
            transport,
            shared: Arc::new(Shared {
                dispatcher: MessageDispatcher::new(notifier),
                inner: Mutex::new(ConnectionInner::default()),
                state_tx,
            }),
        }
    }

    /// Open the broker stream with `token`.
    ///
    /// Returns immediately without touching the network when already
    /// connected or when `token` is empty. A session that is still
    /// handshaking or retrying after a drop is torn down and replaced, so a
    /// rejected token can be swapped without an explicit `disconnect`.
    pub fn connect(&self, token: &str) {
        let mut inner = self.shared.lock_inner();
        if inner.machine.is_connected() {
            warn!("already connected to broker stream; ignoring connect");
            return;
        }
        if token.is_empty() {
            error!("cannot connect to broker stream without a client token");
            return;
        }

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(err) => {
                error!(error = %err, "broker stream requires a tokio runtime");
                return;
            }
        };
        let endpoint = match self.config.stream_url(token) {
            Ok(endpoint) => endpoint,
            Err(err) => {
                error!(error = %err, "invalid broker stream endpoint");
                return;
            }
        };

        if let Some(stale) = inner.active.take() {
            stale.stop.cancel();
            stale.session.close();
            inner.machine.on_disconnected();
            info!("replacing broker stream that had not connected");
        }
        let state = match inner.machine.begin_connect() {
            Ok(state) => state,
            Err(err) => {
                error!(error = %err, "connect rejected by state machine");
                return;
            }
        };
        self.shared.publish(state);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let session = self.transport.open(endpoint, events_tx);
        let stop = CancellationToken::new();
        let pump = runtime.spawn(pump_events(self.shared.clone(), events_rx, stop.clone()));

        inner.token = Some(token.to_owned());
        inner.active = Some(ActiveStream {
            session,
            stop,
            _pump: pump,
        });
        info!(base_url = %self.config.base_url, "connecting to broker stream");
    }

    /// Tear down the stream and cancel any pending reconnect. No-op when idle.
    pub fn disconnect(&self) {
        let mut inner = self.shared.lock_inner();
        let Some(active) = inner.active.take() else {
            debug!("disconnect requested without an active broker stream");
            return;
        };

        active.stop.cancel();
        active.session.close();
        let state = inner.machine.on_disconnected();
        self.shared.publish(state);
        info!("disconnected from broker stream");
    }

    /// True only when both the manager and the transport consider the
    /// stream up.
    pub fn is_connected(&self) -> bool {
        let inner = self.shared.lock_inner();
        inner.machine.is_connected()
            && inner
                .active
                .as_ref()
                .is_some_and(|active| active.session.is_connected())
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.lock_inner().machine.state()
    }

    /// Watch every connection state change.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Register the application handler, replacing any previous one.
    pub fn set_notification_handler<F>(&self, handler: F)
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.shared.dispatcher.set_handler(handler);
    }

    pub fn clear_notification_handler(&self) {
        self.shared.dispatcher.clear_handler();
    }

    /// History client bound to the most recently used token, if any.
    pub fn history(&self) -> Option<HistoryClient> {
        let inner = self.shared.lock_inner();
        inner
            .token
            .as_ref()
            .map(|token| HistoryClient::new(self.config.clone(), token.clone()))
    }
}

impl Drop for PushConnection {
    fn drop(&mut self) {
        let mut inner = self.shared.lock_inner();
        if let Some(active) = inner.active.take() {
            active.stop.cancel();
            active.session.close();
        }
    }
}

impl Shared {
    fn lock_inner(&self) -> MutexGuard<'_, ConnectionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
    }

    fn handle_event(&self, event: TransportEvent, stop: &CancellationToken) {
        match event {
            TransportEvent::Connected => {
                if self.apply(stop, ConnectionStateMachine::on_connected) {
                    info!("broker stream connected");
                }
            }
            TransportEvent::Disconnected { reason } => {
                if self.apply(stop, ConnectionStateMachine::on_disconnected) {
                    warn!(%reason, "broker stream disconnected; transport will retry");
                }
            }
            TransportEvent::Message(message) => {
                if stop.is_cancelled() {
                    return;
                }
                debug!(
                    message_id = message.id,
                    priority = message.priority,
                    "broker message received"
                );
                self.dispatcher.dispatch(&message);
            }
            TransportEvent::Error(err) => {
                if err.is_transient() {
                    warn!(error = %err, "broker stream error");
                } else {
                    error!(error = %err, "broker stream error");
                }
            }
        }
    }

    /// Apply a state transition unless the stream was torn down meanwhile.
    fn apply(
        &self,
        stop: &CancellationToken,
        transition: fn(&mut ConnectionStateMachine) -> ConnectionState,
    ) -> bool {
        let mut inner = self.lock_inner();
        if stop.is_cancelled() {
            return false;
        }
        let state = transition(&mut inner.machine);
        self.publish(state);
        true
    }
}

async fn pump_events(
    shared: Arc<Shared>,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
    stop: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };
        shared.handle_event(event, &stop);
    }
    debug!("broker stream event pump stopped");
}
