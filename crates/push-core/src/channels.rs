use tracing::{debug, warn};

use crate::{
    notifier::Notifier,
    types::{Importance, NotificationChannel},
};

pub const DEFAULT_CHANNEL_ID: &str = "default";
pub const CRITICAL_CHANNEL_ID: &str = "critical";
pub const NORMAL_CHANNEL_ID: &str = "normal";

/// The fixed set of channels declared at startup.
pub static CHANNELS: [NotificationChannel; 3] = [
    NotificationChannel {
        id: DEFAULT_CHANNEL_ID,
        display_name: "Default",
        importance: Importance::High,
        sound_enabled: true,
        vibration_enabled: false,
    },
    NotificationChannel {
        id: CRITICAL_CHANNEL_ID,
        display_name: "Critical",
        importance: Importance::High,
        sound_enabled: true,
        vibration_enabled: true,
    },
    NotificationChannel {
        id: NORMAL_CHANNEL_ID,
        display_name: "Normal",
        importance: Importance::Default,
        sound_enabled: false,
        vibration_enabled: false,
    },
];

/// Look up a declared channel by id.
pub fn channel(id: &str) -> Option<&'static NotificationChannel> {
    CHANNELS.iter().find(|channel| channel.id == id)
}

/// Declare every channel with the notification subsystem.
///
/// Safe to call repeatedly. Failures are logged and skipped; the return value
/// is the number of channels the subsystem accepted.
pub async fn setup_channels(notifier: &dyn Notifier) -> usize {
    let mut created = 0;
    for channel in &CHANNELS {
        match notifier.create_channel(channel).await {
            Ok(()) => {
                created += 1;
                debug!(channel_id = channel.id, "notification channel declared");
            }
            Err(err) => {
                warn!(
                    channel_id = channel.id,
                    error = %err,
                    "failed to declare notification channel"
                );
            }
        }
    }
    created
}
