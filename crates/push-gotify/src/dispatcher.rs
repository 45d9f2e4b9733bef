use std::{
    panic::AssertUnwindSafe,
    sync::{Arc, Mutex, PoisonError, RwLock},
};

use futures_util::FutureExt;
use push_core::{DisplayRequest, Message, Notifier, route};
use tokio::{runtime::Handle, sync::mpsc};
use tracing::{debug, error, trace, warn};

/// Application callback invoked for every inbound message.
pub type NotificationHandler = Arc<dyn Fn(&Message) + Send + Sync>;

/// Fans each inbound message out to the application handler and the
/// local-notification subsystem.
///
/// Only one handler is honored at a time; registering a new one replaces the
/// previous registration.
pub struct MessageDispatcher {
    handler: RwLock<Option<NotificationHandler>>,
    renderer: RenderQueue,
}

impl MessageDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            handler: RwLock::new(None),
            renderer: RenderQueue::new(notifier),
        }
    }

    pub fn set_handler<F>(&self, handler: F)
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        let mut slot = self.handler.write().unwrap_or_else(PoisonError::into_inner);
        if slot.replace(Arc::new(handler)).is_some() {
            debug!("replaced previously registered notification handler");
        }
    }

    pub fn clear_handler(&self) {
        self.handler
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Run the handler synchronously, then queue the local notification.
    pub fn dispatch(&self, message: &Message) {
        self.invoke_handler(message);

        let request = DisplayRequest::for_message(message, route(message.priority));
        self.renderer.submit(request);
    }

    fn invoke_handler(&self, message: &Message) {
        // Clone out of the lock so the handler may re-register itself.
        let handler = self
            .handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(handler) = handler else {
            trace!(message_id = message.id, "no notification handler registered");
            return;
        };

        if std::panic::catch_unwind(AssertUnwindSafe(|| handler(message))).is_err() {
            error!(message_id = message.id, "notification handler panicked");
        }
    }
}

/// Single background worker that renders display requests in arrival order.
///
/// The worker lives on the runtime that submitted to it. When that runtime
/// shuts down the next submit starts a fresh worker on the caller's runtime.
struct RenderQueue {
    worker: Mutex<Option<mpsc::UnboundedSender<DisplayRequest>>>,
    notifier: Arc<dyn Notifier>,
}

impl RenderQueue {
    fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            worker: Mutex::new(None),
            notifier,
        }
    }

    fn submit(&self, request: DisplayRequest) {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if worker.as_ref().is_none_or(|tx| tx.is_closed()) {
            let Ok(runtime) = Handle::try_current() else {
                warn!("no tokio runtime available; dropping notification");
                return;
            };
            if worker.is_some() {
                debug!("notification render worker stopped; restarting");
            }
            let (tx, rx) = mpsc::unbounded_channel();
            runtime.spawn(render_worker(rx, self.notifier.clone()));
            *worker = Some(tx);
        }

        if let Some(tx) = worker.as_ref()
            && tx.send(request).is_err()
        {
            warn!("notification render worker stopped; dropping notification");
        }
    }
}

async fn render_worker(
    mut requests: mpsc::UnboundedReceiver<DisplayRequest>,
    notifier: Arc<dyn Notifier>,
) {
    while let Some(request) = requests.recv().await {
        let channel_id = request.channel_id;
        match AssertUnwindSafe(notifier.display(request))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => trace!(channel_id, "local notification displayed"),
            Ok(Err(err)) => warn!(channel_id, error = %err, "local notification failed"),
            Err(_) => error!(channel_id, "notifier panicked while rendering"),
        }
    }
    trace!("notification render worker exited");
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use async_trait::async_trait;
    use push_core::{Importance, NotificationChannel, NotifierError};
    use serde_json::{Map, json};
    use tokio::time::timeout;

    use super::*;

    struct RecordingNotifier {
        tx: mpsc::UnboundedSender<DisplayRequest>,
        fail_titles: Vec<&'static str>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn create_channel(
            &self,
            _channel: &NotificationChannel,
        ) -> Result<(), NotifierError> {
            Ok(())
        }

        async fn display(&self, request: DisplayRequest) -> Result<(), NotifierError> {
            if self.fail_titles.contains(&request.title.as_str()) {
                return Err(NotifierError::PermissionDenied);
            }
            if request.title == "explode" {
                panic!("renderer blew up");
            }
            let _ = self.tx.send(request);
            Ok(())
        }
    }

    fn recording(
        fail_titles: Vec<&'static str>,
    ) -> (Arc<dyn Notifier>, mpsc::UnboundedReceiver<DisplayRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(RecordingNotifier { tx, fail_titles }), rx)
    }

    fn message(id: i64, title: &str, priority: i32) -> Message {
        let mut extras = Map::new();
        extras.insert("orderId".into(), json!("42"));
        Message {
            id,
            app_id: 1,
            title: title.to_owned(),
            body: "body".to_owned(),
            priority,
            timestamp: "2024-03-01T10:00:00Z".to_owned(),
            extras,
        }
    }

    async fn next_render(rx: &mut mpsc::UnboundedReceiver<DisplayRequest>) -> DisplayRequest {
        timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("render should happen in time")
            .expect("render channel should stay open")
    }

    #[tokio::test]
    async fn invokes_handler_with_message_and_renders_critical_notification() {
        let (notifier, mut rendered) = recording(Vec::new());
        let dispatcher = MessageDispatcher::new(notifier);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        dispatcher.set_handler(move |message| {
            seen_clone.lock().expect("seen lock").push(message.clone());
        });

        let incoming = message(1, "Order shipped", 8);
        dispatcher.dispatch(&incoming);

        assert_eq!(seen.lock().expect("seen lock").as_slice(), [incoming.clone()]);
        let request = next_render(&mut rendered).await;
        assert_eq!(request.channel_id, "critical");
        assert_eq!(request.importance, Importance::High);
        assert!(request.vibration_pattern.is_some());
        assert_eq!(request.data, incoming.extras);
    }

    #[tokio::test]
    async fn only_latest_handler_is_invoked() {
        let (notifier, _rendered) = recording(Vec::new());
        let dispatcher = MessageDispatcher::new(notifier);
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let first_clone = first.clone();
        dispatcher.set_handler(move |_| {
            first_clone.fetch_add(1, Ordering::SeqCst);
        });
        let second_clone = second.clone();
        dispatcher.set_handler(move |_| {
            second_clone.fetch_add(1, Ordering::SeqCst);
        });

        dispatcher.dispatch(&message(1, "hello", 3));

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn handler_panic_does_not_block_rendering() {
        let (notifier, mut rendered) = recording(Vec::new());
        let dispatcher = MessageDispatcher::new(notifier);
        dispatcher.set_handler(|_| panic!("handler failure"));

        dispatcher.dispatch(&message(3, "still shown", 6));

        let request = next_render(&mut rendered).await;
        assert_eq!(request.title, "still shown");
        assert_eq!(request.sound, None);
    }

    #[tokio::test]
    async fn render_failures_are_isolated_and_order_is_kept() {
        let (notifier, mut rendered) = recording(vec!["denied"]);
        let dispatcher = MessageDispatcher::new(notifier);

        dispatcher.dispatch(&message(1, "denied", 9));
        dispatcher.dispatch(&message(2, "explode", 9));
        dispatcher.dispatch(&message(3, "first", 2));
        dispatcher.dispatch(&message(4, "second", 7));

        assert_eq!(next_render(&mut rendered).await.title, "first");
        let second = next_render(&mut rendered).await;
        assert_eq!(second.title, "second");
        assert_eq!(second.sound, Some(true));
    }

    #[tokio::test]
    async fn dispatch_without_handler_still_renders() {
        let (notifier, mut rendered) = recording(Vec::new());
        let dispatcher = MessageDispatcher::new(notifier);

        dispatcher.dispatch(&message(5, "quiet", 2));

        let request = next_render(&mut rendered).await;
        assert_eq!(request.importance, Importance::Low);
        assert_eq!(request.channel_id, "normal");
    }

    #[tokio::test]
    async fn cleared_handler_is_not_invoked() {
        let (notifier, _rendered) = recording(Vec::new());
        let dispatcher = MessageDispatcher::new(notifier);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        dispatcher.set_handler(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        dispatcher.clear_handler();

        dispatcher.dispatch(&message(1, "nobody listens", 5));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn render_worker_restarts_on_a_new_runtime() {
        let (notifier, mut rendered) = recording(Vec::new());
        let dispatcher = MessageDispatcher::new(notifier);

        let first = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("first runtime");
        first.block_on(async {
            dispatcher.dispatch(&message(1, "before shutdown", 5));
            assert_eq!(next_render(&mut rendered).await.title, "before shutdown");
        });
        drop(first);

        let second = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("second runtime");
        second.block_on(async {
            dispatcher.dispatch(&message(2, "after restart", 5));
            assert_eq!(next_render(&mut rendered).await.title, "after restart");
        });
    }
}
