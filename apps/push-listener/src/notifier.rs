//! Console stand-in for the device notification tray.

use std::{collections::HashSet, sync::Mutex};

use async_trait::async_trait;
use push_core::{DisplayRequest, NotificationChannel, Notifier, NotifierError, channel};
use tracing::info;

/// Logs every display request instead of drawing it.
#[derive(Debug, Default)]
pub struct LogNotifier {
    channels: Mutex<HashSet<&'static str>>,
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn create_channel(&self, channel: &NotificationChannel) -> Result<(), NotifierError> {
        let mut channels = self
            .channels
            .lock()
            .map_err(|_| NotifierError::Backend("poisoned lock".to_owned()))?;
        let fresh = channels.insert(channel.id);
        info!(
            channel_id = channel.id,
            importance = ?channel.importance,
            sound = channel.sound_enabled,
            vibration = channel.vibration_enabled,
            fresh,
            "notification channel ready"
        );
        Ok(())
    }

    async fn display(&self, request: DisplayRequest) -> Result<(), NotifierError> {
        let known = self
            .channels
            .lock()
            .map_err(|_| NotifierError::Backend("poisoned lock".to_owned()))?
            .contains(request.channel_id);
        let channel_name =
            channel(request.channel_id).map_or("unknown", |channel| channel.display_name);
        let data = serde_json::to_string(&request.data)
            .map_err(|err| NotifierError::Backend(err.to_string()))?;
        info!(
            channel_id = request.channel_id,
            channel_name,
            known_channel = known,
            importance = ?request.importance,
            sound = request.sound.unwrap_or(false),
            vibrate = request.vibration_pattern.is_some(),
            title = %request.title,
            body = %request.body,
            %data,
            "notification"
        );
        Ok(())
    }
}
