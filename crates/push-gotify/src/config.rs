use std::time::Duration;

use push_core::{PushError, PushErrorCategory, RetryPolicy};
use url::Url;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Broker location and client tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Broker base URL, for example `https://push.example.org`.
    pub base_url: Url,
    /// Backoff used by the stream transport between reconnect attempts.
    pub reconnect: RetryPolicy,
    /// Per-request timeout for the REST history endpoints.
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            reconnect: RetryPolicy::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Parse `base_url` and apply defaults.
    pub fn parse(base_url: &str) -> Result<Self, PushError> {
        let url = Url::parse(base_url).map_err(|err| {
            PushError::new(
                PushErrorCategory::Config,
                "invalid_base_url",
                format!("invalid broker url '{base_url}': {err}"),
            )
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(PushError::new(
                PushErrorCategory::Config,
                "invalid_base_url",
                format!("broker url must use http or https: {base_url}"),
            ));
        }
        Ok(Self::new(url))
    }

    pub fn with_reconnect(mut self, reconnect: RetryPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// WebSocket endpoint `<base>/stream?token=<token>`.
    pub fn stream_url(&self, token: &str) -> Result<Url, PushError> {
        let mut url = self.base_url.clone();
        let ws_scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(PushError::new(
                    PushErrorCategory::Config,
                    "invalid_base_url",
                    format!("unsupported broker url scheme '{other}'"),
                ));
            }
        };
        url.set_scheme(ws_scheme).map_err(|()| {
            PushError::new(
                PushErrorCategory::Config,
                "invalid_base_url",
                format!("cannot switch broker url to {ws_scheme}"),
            )
        })?;
        append_segments(&mut url, &["stream"])?;
        url.set_query(None);
        url.query_pairs_mut().append_pair("token", token);
        Ok(url)
    }

    /// REST endpoint `<base>/<segments...>`.
    pub fn rest_url(&self, segments: &[&str]) -> Result<Url, PushError> {
        let mut url = self.base_url.clone();
        append_segments(&mut url, segments)?;
        url.set_query(None);
        Ok(url)
    }
}

fn append_segments(url: &mut Url, segments: &[&str]) -> Result<(), PushError> {
    let mut path = url.path_segments_mut().map_err(|()| {
        PushError::new(
            PushErrorCategory::Config,
            "invalid_base_url",
            "broker url cannot carry a path",
        )
    })?;
    path.pop_if_empty().extend(segments);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_secure_stream_url_with_token_query() {
        let config = ClientConfig::parse("https://push.example.org").expect("config should parse");
        let url = config.stream_url("c-token").expect("stream url should build");
        assert_eq!(url.as_str(), "wss://push.example.org/stream?token=c-token");
    }

    #[test]
    fn keeps_base_path_prefix_and_plain_scheme() {
        let config =
            ClientConfig::parse("http://10.0.2.2:8080/gotify/").expect("config should parse");
        let url = config.stream_url("a b").expect("stream url should build");
        assert_eq!(url.as_str(), "ws://10.0.2.2:8080/gotify/stream?token=a+b");
    }

    #[test]
    fn builds_rest_urls() {
        let config = ClientConfig::parse("https://push.example.org").expect("config should parse");
        assert_eq!(
            config.rest_url(&["message"]).expect("url").as_str(),
            "https://push.example.org/message"
        );
        assert_eq!(
            config.rest_url(&["message", "12"]).expect("url").as_str(),
            "https://push.example.org/message/12"
        );
    }

    #[test]
    fn rejects_non_http_base_urls() {
        let err = ClientConfig::parse("ftp://push.example.org").expect_err("ftp must fail");
        assert_eq!(err.code, "invalid_base_url");
        assert!(ClientConfig::parse("not a url").is_err());
    }

    #[test]
    fn defaults_to_unbounded_reconnect() {
        let config = ClientConfig::parse("https://push.example.org").expect("config should parse");
        assert_eq!(config.reconnect, RetryPolicy::default());
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
    }
}
