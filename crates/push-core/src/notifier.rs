use async_trait::async_trait;

use crate::{
    error::NotifierError,
    types::{DisplayRequest, NotificationChannel},
};

/// The device's local-notification subsystem.
///
/// Channel creation must behave as an upsert so that setup can run on every
/// start. Implementations are free to fail; callers log and carry on.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Declare (or re-declare) a notification channel.
    async fn create_channel(&self, channel: &NotificationChannel) -> Result<(), NotifierError>;

    /// Render one notification.
    async fn display(&self, request: DisplayRequest) -> Result<(), NotifierError>;
}
