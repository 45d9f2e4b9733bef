use push_core::{Message, PushError, PushErrorCategory};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::config::ClientConfig;

/// Header carrying the client token on REST calls.
pub const AUTH_HEADER: &str = "X-Gotify-Key";

/// Body of `GET /message`. The broker's `paging` object is ignored.
#[derive(Debug, Deserialize)]
struct MessagePage {
    messages: Vec<Message>,
}

/// REST access to the broker's message store.
///
/// Independent of the live stream: calls work whether or not a
/// `PushConnection` is connected, and may run concurrently.
#[derive(Debug, Clone)]
pub struct HistoryClient {
    http: Client,
    config: ClientConfig,
    token: String,
}

impl HistoryClient {
    pub fn new(config: ClientConfig, token: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "failed to build tuned http client; using defaults");
                Client::new()
            });
        Self::with_http(config, token, http)
    }

    pub fn with_http(config: ClientConfig, token: impl Into<String>, http: Client) -> Self {
        Self {
            http,
            config,
            token: token.into(),
        }
    }

    /// Latest `limit` messages, or an empty list on any failure.
    pub async fn list_messages(&self, limit: u32) -> Vec<Message> {
        match self.try_list_messages(limit).await {
            Ok(messages) => messages,
            Err(err) => {
                warn!(limit, error = %err, "failed to list broker messages");
                Vec::new()
            }
        }
    }

    /// Delete one message; `true` iff the broker answered 2xx.
    pub async fn delete_message(&self, id: i64) -> bool {
        match self.try_delete_message(id).await {
            Ok(()) => true,
            Err(err) => {
                warn!(message_id = id, error = %err, "failed to delete broker message");
                false
            }
        }
    }

    /// Delete every message; `true` iff the broker answered 2xx.
    pub async fn delete_all_messages(&self) -> bool {
        match self.try_delete_all_messages().await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "failed to delete all broker messages");
                false
            }
        }
    }

    pub async fn try_list_messages(&self, limit: u32) -> Result<Vec<Message>, PushError> {
        let url = self.config.rest_url(&["message"])?;
        let response = self
            .http
            .get(url)
            .query(&[("limit", limit)])
            .header(AUTH_HEADER, &self.token)
            .send()
            .await
            .map_err(|err| map_reqwest_error(err, "list messages"))?;
        ensure_success(response.status(), "list messages")?;

        let page: MessagePage = response
            .json()
            .await
            .map_err(|err| map_reqwest_error(err, "list messages"))?;
        debug!(count = page.messages.len(), "listed broker messages");
        Ok(page.messages)
    }

    pub async fn try_delete_message(&self, id: i64) -> Result<(), PushError> {
        let id = id.to_string();
        let url = self.config.rest_url(&["message", &id])?;
        self.send_delete(url, "delete message").await
    }

    pub async fn try_delete_all_messages(&self) -> Result<(), PushError> {
        let url = self.config.rest_url(&["message"])?;
        self.send_delete(url, "delete all messages").await
    }

    async fn send_delete(&self, url: Url, operation: &str) -> Result<(), PushError> {
        let response = self
            .http
            .delete(url)
            .header(AUTH_HEADER, &self.token)
            .send()
            .await
            .map_err(|err| map_reqwest_error(err, operation))?;
        ensure_success(response.status(), operation)
    }
}

fn ensure_success(status: StatusCode, operation: &str) -> Result<(), PushError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(PushError::http_status(status.as_u16(), operation))
    }
}

fn map_reqwest_error(err: reqwest::Error, operation: &str) -> PushError {
    if err.is_decode() {
        PushError::new(
            PushErrorCategory::Serialization,
            "invalid_response_body",
            format!("{operation}: {err}"),
        )
    } else if err.is_timeout() {
        PushError::new(
            PushErrorCategory::Network,
            "http_timeout",
            format!("{operation}: {err}"),
        )
    } else {
        PushError::new(
            PushErrorCategory::Network,
            "http_request_failed",
            format!("{operation}: {err}"),
        )
    }
}
