//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Coordinator configuration.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Window within which repeated clicks on the same slot are absorbed.
    pub debounce_window: Duration,
    /// Cadence of the background state poll.
    pub poll_interval: Duration,
    /// Ticks before an unresolved poll session gives up.
    pub max_poll_ticks: u32,
    /// Capacity of the event broadcast channel.
    pub broadcast_capacity: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            debounce_window: Duration::from_millis(500),
            poll_interval: Duration::from_secs(60),
            max_poll_ticks: 30, // ~30 minutes at the default interval
            broadcast_capacity: 256,
        }
    }
}

/// Connection settings for the remote email service.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL of the email service API.
    pub base_url: String,
    /// Optional bearer token for the API.
    pub api_token: Option<SecretString>,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl RemoteConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: None,
            request_timeout: Duration::from_secs(120),
        }
    }

    /// Build config from environment variables.
    ///
    /// `OUTREACH_API_URL` is required; `OUTREACH_API_TOKEN` and
    /// `OUTREACH_HTTP_TIMEOUT_SECS` are optional.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = std::env::var("OUTREACH_API_URL")
            .map_err(|_| ConfigError::MissingEnvVar("OUTREACH_API_URL".to_string()))?;

        let api_token = std::env::var("OUTREACH_API_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .map(SecretString::from);

        let request_timeout = match std::env::var("OUTREACH_HTTP_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs: u64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "OUTREACH_HTTP_TIMEOUT_SECS".to_string(),
                    message: format!("not a number: {raw}"),
                })?;
                Duration::from_secs(secs)
            }
            Err(_) => Duration::from_secs(120),
        };

        Ok(Self {
            base_url,
            api_token,
            request_timeout,
        })
    }
}
