//! Environment-backed runtime configuration for `push-listener`.

use std::{env, error::Error, fmt, time::Duration};

use push_core::RetryPolicy;
use push_gotify::ClientConfig;

const DEVELOPMENT_BASE_URL: &str = "http://localhost:8080";
const PRODUCTION_BASE_URL: &str = "https://push.example.org";
const DEFAULT_HISTORY_LIMIT: u32 = 20;
const DEFAULT_RECONNECT_BASE_MS: u64 = 1_000;
const DEFAULT_RECONNECT_MAX_MS: u64 = 5_000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;

/// Which broker deployment to talk to when no explicit URL is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerEnvironment {
    Development,
    Production,
}

impl BrokerEnvironment {
    fn default_base_url(self) -> &'static str {
        match self {
            Self::Development => DEVELOPMENT_BASE_URL,
            Self::Production => PRODUCTION_BASE_URL,
        }
    }
}

/// Runtime configuration used by the listener.
#[derive(Debug, Clone, PartialEq)]
pub struct ListenerConfig {
    pub environment: BrokerEnvironment,
    /// Broker client settings, base URL already resolved.
    pub client: ClientConfig,
    /// Client token; `None` leaves the stream disconnected.
    pub client_token: Option<String>,
    /// Messages fetched from history at boot. 0 disables the fetch.
    pub history_limit: u32,
}

impl ListenerConfig {
    /// Parse configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(mut lookup: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let environment = match optional_trimmed_env("PUSH_ENV", &mut lookup) {
            None => BrokerEnvironment::Production,
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "development" | "dev" => BrokerEnvironment::Development,
                "production" | "prod" => BrokerEnvironment::Production,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "PUSH_ENV",
                        value,
                        reason: "expected 'development' or 'production'".to_owned(),
                    });
                }
            },
        };

        let base_url = optional_trimmed_env("PUSH_BASE_URL", &mut lookup)
            .unwrap_or_else(|| environment.default_base_url().to_owned());
        let client_token = optional_trimmed_env("PUSH_CLIENT_TOKEN", &mut lookup);
        let history_limit =
            parse_with_default("PUSH_HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT, &mut lookup)?;
        let reconnect_base_ms =
            parse_with_default("PUSH_RECONNECT_BASE_MS", DEFAULT_RECONNECT_BASE_MS, &mut lookup)?;
        let reconnect_max_ms =
            parse_with_default("PUSH_RECONNECT_MAX_MS", DEFAULT_RECONNECT_MAX_MS, &mut lookup)?;
        let reconnect_max_attempts =
            parse_optional::<u32, _>("PUSH_RECONNECT_MAX_ATTEMPTS", &mut lookup)?;
        let request_timeout_ms =
            parse_with_default("PUSH_REQUEST_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT_MS, &mut lookup)?;

        if reconnect_base_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "PUSH_RECONNECT_BASE_MS",
                value: "0".to_owned(),
                reason: "must be at least 1".to_owned(),
            });
        }
        if reconnect_max_ms < reconnect_base_ms {
            return Err(ConfigError::InvalidValue {
                key: "PUSH_RECONNECT_MAX_MS",
                value: reconnect_max_ms.to_string(),
                reason: format!("must be at least PUSH_RECONNECT_BASE_MS ({reconnect_base_ms})"),
            });
        }

        if request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "PUSH_REQUEST_TIMEOUT_MS",
                value: "0".to_owned(),
                reason: "must be at least 1".to_owned(),
            });
        }

        let mut reconnect = RetryPolicy::new(reconnect_base_ms, reconnect_max_ms);
        if let Some(max_attempts) = reconnect_max_attempts {
            reconnect = reconnect.with_max_attempts(max_attempts);
        }
        let client = ClientConfig::parse(&base_url)
            .map_err(|err| ConfigError::InvalidValue {
                key: "PUSH_BASE_URL",
                value: base_url.clone(),
                reason: err.message,
            })?
            .with_reconnect(reconnect)
            .with_request_timeout(Duration::from_millis(request_timeout_ms));

        Ok(Self {
            environment,
            client,
            client_token,
            history_limit,
        })
    }
}

/// Errors produced while parsing runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue { key, value, reason } => {
                write!(f, "invalid {key}='{value}': {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

fn optional_trimmed_env<F>(key: &'static str, lookup: &mut F) -> Option<String>
where
    F: FnMut(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_with_default<T, F>(key: &'static str, default: T, lookup: &mut F) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
    F: FnMut(&str) -> Option<String>,
{
    Ok(parse_optional(key, lookup)?.unwrap_or(default))
}

fn parse_optional<T, F>(key: &'static str, lookup: &mut F) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
    F: FnMut(&str) -> Option<String>,
{
    let Some(value) = optional_trimmed_env(key, lookup) else {
        return Ok(None);
    };
    value
        .parse::<T>()
        .map(Some)
        .map_err(|err| ConfigError::InvalidValue {
            key,
            reason: err.to_string(),
            value,
        })
}
