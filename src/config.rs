use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ClientError, Result};

/// Client configuration, loaded from the environment.
///
/// Every knob has a sensible default except the API base URL, which must be
/// set explicitly so a misconfigured client fails at startup instead of
/// talking to the wrong backend.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL for the REST gateway, e.g. `https://api.solace.dev`.
    pub api_base_url: String,
    /// WebSocket endpoint for the realtime connection.
    pub realtime_url: String,
    /// Default per-request deadline.
    pub request_timeout: Duration,
    /// Where the bearer credential is persisted between sessions.
    /// `None` keeps the credential in memory only.
    pub credential_path: Option<PathBuf>,
    /// Interval for the background unread-count resync.
    pub unread_refresh_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let api_base_url = env::var("SOLACE_API_BASE_URL")
            .map_err(|_| ClientError::Config("SOLACE_API_BASE_URL is not set".into()))?;

        let realtime_url = env::var("SOLACE_REALTIME_URL").unwrap_or_else(|_| {
            derive_realtime_url(&api_base_url)
        });

        let request_timeout_ms: u64 = env::var("SOLACE_REQUEST_TIMEOUT_MS")
            .unwrap_or_else(|_| "10000".to_string())
            .parse()
            .map_err(|e| ClientError::Config(format!("invalid SOLACE_REQUEST_TIMEOUT_MS: {e}")))?;

        let credential_path = match env::var("SOLACE_CREDENTIAL_PATH") {
            Ok(p) if !p.trim().is_empty() => Some(PathBuf::from(p)),
            _ => default_credential_path(),
        };

        let unread_refresh_secs: u64 = env::var("SOLACE_UNREAD_REFRESH_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .map_err(|e| ClientError::Config(format!("invalid SOLACE_UNREAD_REFRESH_SECS: {e}")))?;

        Ok(Config {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            realtime_url,
            request_timeout: Duration::from_millis(request_timeout_ms),
            credential_path,
            unread_refresh_interval: Duration::from_secs(unread_refresh_secs),
        })
    }

    /// Configuration for tests and embedded use: no persistence, short timeout.
    pub fn for_base_url(api_base_url: &str) -> Self {
        Config {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            realtime_url: derive_realtime_url(api_base_url),
            request_timeout: Duration::from_secs(10),
            credential_path: None,
            unread_refresh_interval: Duration::from_secs(60),
        }
    }
}

/// `https://api.solace.dev` -> `wss://api.solace.dev/realtime`
fn derive_realtime_url(api_base_url: &str) -> String {
    let base = api_base_url.trim_end_matches('/');
    let ws = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{ws}/realtime")
}

fn default_credential_path() -> Option<PathBuf> {
    env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".solace").join("credential"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_ws_url_from_https_base() {
        assert_eq!(
            derive_realtime_url("https://api.solace.dev/"),
            "wss://api.solace.dev/realtime"
        );
        assert_eq!(
            derive_realtime_url("http://localhost:8000"),
            "ws://localhost:8000/realtime"
        );
    }

    #[test]
    fn for_base_url_strips_trailing_slash() {
        let config = Config::for_base_url("http://localhost:8000/");
        assert_eq!(config.api_base_url, "http://localhost:8000");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert!(config.credential_path.is_none());
    }
}
