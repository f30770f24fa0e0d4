use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::utils::errors::SettingsError;

/// Client configuration.
///
/// Every knob has a default; an optional `settings` file and
/// `DAILY_SET_*` environment variables override them.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub api_base_url: String,
    pub ws_url: String,
    #[serde(default)]
    pub ws_token: Option<String>,
    pub request_timeout_ms: u64,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    /// Server start times further ahead of the local clock than this are
    /// discarded. Heuristic, not a contract.
    pub clock_skew_ms: i64,
    pub session_query_throttle_ms: u64,
    pub state_dir: PathBuf,
}

impl Settings {
    pub fn load() -> Result<Self, SettingsError> {
        let config = Config::builder()
            .set_default("api_base_url", "http://localhost:8000")
            .and_then(|b| b.set_default("ws_url", "ws://localhost:8000/ws"))
            .and_then(|b| b.set_default("request_timeout_ms", 10_000i64))
            .and_then(|b| b.set_default("backoff_base_ms", 250i64))
            .and_then(|b| b.set_default("backoff_max_ms", 10_000i64))
            .and_then(|b| b.set_default("clock_skew_ms", 3_000i64))
            .and_then(|b| b.set_default("session_query_throttle_ms", 200i64))
            .and_then(|b| b.set_default("state_dir", ".daily-set"))
            .map_err(|e| SettingsError::Invalid(e.to_string()))?
            .add_source(File::with_name("settings").required(false))
            .add_source(Environment::with_prefix("DAILY_SET"))
            .build()
            .map_err(|e| SettingsError::Invalid(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| SettingsError::Invalid(e.to_string()))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            ws_url: "ws://localhost:8000/ws".to_string(),
            ws_token: None,
            request_timeout_ms: 10_000,
            backoff_base_ms: 250,
            backoff_max_ms: 10_000,
            clock_skew_ms: 3_000,
            session_query_throttle_ms: 200,
            state_dir: PathBuf::from(".daily-set"),
        }
    }
}
