mod config;
mod logging;
mod notifier;

use std::sync::Arc;

use push_core::{ConnectionState, setup_channels};
use push_gotify::PushConnection;
use tracing::{error, info, warn};

use crate::{config::ListenerConfig, notifier::LogNotifier};

#[tokio::main]
async fn main() {
    logging::init();

    let config = match ListenerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "listener config invalid");
            std::process::exit(2);
        }
    };
    info!(
        environment = ?config.environment,
        base_url = %config.client.base_url,
        "starting push-listener"
    );

    let notifier = Arc::new(LogNotifier::default());
    setup_channels(&*notifier).await;

    let connection = PushConnection::new(config.client.clone(), notifier);
    connection.set_notification_handler(|message| {
        info!(
            message_id = message.id,
            app_id = message.app_id,
            priority = message.priority,
            title = %message.title,
            "message received"
        );
    });

    let token = config.client_token.clone().unwrap_or_default();
    if token.is_empty() {
        warn!("PUSH_CLIENT_TOKEN is not set; stream will stay disconnected");
    }
    connection.connect(&token);

    if config.history_limit > 0
        && let Some(history) = connection.history()
    {
        let messages = history.list_messages(config.history_limit).await;
        info!(count = messages.len(), "fetched message history");
        for message in &messages {
            info!(
                message_id = message.id,
                priority = message.priority,
                timestamp = %message.timestamp,
                title = %message.title,
                "history entry"
            );
        }
    }

    let mut states = connection.subscribe_state();
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(err) = signal {
                    error!(error = %err, "failed to listen for ctrl-c");
                }
                break;
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state: ConnectionState = *states.borrow_and_update();
                info!(?state, connected = connection.is_connected(), "connection state changed");
            }
        }
    }

    connection.disconnect();
    info!("push-listener stopped");
}
