use std::env;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_QUESTION_ENDPOINT: &str = "http://127.0.0.1:5000/generate_questions";
pub const DEFAULT_EMBED_ORIGIN: &str = "http://localhost:5173";

/// Where and how to reach the question generation backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuestionSourceConfig {
    pub endpoint: String,
    /// Generation transcribes the whole video, so this is generous.
    pub timeout: Duration,
}

impl Default for QuestionSourceConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_QUESTION_ENDPOINT.into(),
            timeout: Duration::from_secs(300),
        }
    }
}

impl QuestionSourceConfig {
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but unparsable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build the config from any variable lookup, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but unparsable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let endpoint = non_empty(lookup("RETAIN_QUESTION_ENDPOINT")).unwrap_or(defaults.endpoint);
        let timeout = secs_var(&lookup, "RETAIN_REQUEST_TIMEOUT_SECS")?.unwrap_or(defaults.timeout);
        Ok(Self { endpoint, timeout })
    }
}

/// Host-side timings and the origin the embedded quiz is loaded from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BridgeConfig {
    pub embed_origin: String,
    pub telemetry_interval: Duration,
    pub url_poll_interval: Duration,
    /// Wait after a navigation before injecting, so the quiz does not flash
    /// over a pre-roll ad that has not been detected yet.
    pub inject_debounce: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            embed_origin: DEFAULT_EMBED_ORIGIN.into(),
            telemetry_interval: Duration::from_secs(1),
            url_poll_interval: Duration::from_millis(500),
            inject_debounce: Duration::from_secs(1),
        }
    }
}

impl BridgeConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|var| env::var(var).ok())
    }

    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            embed_origin: non_empty(lookup("RETAIN_EMBED_ORIGIN")).unwrap_or(defaults.embed_origin),
            ..defaults
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn secs_var(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    let Some(raw) = non_empty(lookup(var)) else {
        return Ok(None);
    };
    raw.parse::<u64>()
        .map(|secs| Some(Duration::from_secs(secs)))
        .map_err(|_| ConfigError::InvalidValue { var, raw })
}
