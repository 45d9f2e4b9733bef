//! Log output for the push listener.

use std::env;

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,push_listener=debug,push_gotify=debug";

/// Install the listener's fmt subscriber.
///
/// The filter comes from the first non-empty, parseable value of `RUST_LOG`,
/// `PUSH_LISTENER_LOG`, then `PUSH_LOG`; otherwise broker and listener
/// targets log at debug and everything else at info.
pub fn init() {
    let env_filter = filter_from_env();
    let _ = tracing_subscriber::fmt()
        .with_target(true)
        .with_env_filter(env_filter)
        .try_init();
}

fn filter_from_env() -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    ["PUSH_LISTENER_LOG", "PUSH_LOG"]
        .into_iter()
        .find_map(|key| {
            env::var(key)
                .ok()
                .filter(|value| !value.trim().is_empty())
                .and_then(|value| EnvFilter::try_new(value).ok())
        })
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}
