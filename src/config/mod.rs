//! Configuration module for the voicebridge server
//!
//! Configuration comes from environment variables (with `.env` support via
//! dotenvy, loaded in main.rs at application startup). The only required
//! value is the OpenAI API key; everything else has a sensible default.
//!
//! # Example
//! ```rust,no_run
//! use voicebridge::config::ServerConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::from_env()?;
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use thiserror::Error;

use crate::core::upstream::{
    DEFAULT_REALTIME_MODEL, OPENAI_REALTIME_URL, UPSTREAM_RECONNECT_DELAY, UpstreamConfig,
};

/// Default listening host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default listening port.
pub const DEFAULT_PORT: u16 = 5050;

/// Default interval between keep-alive firings on the inbound call socket.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// Errors that can occur while loading configuration.
///
/// All of these are fatal at startup: the process exits with a non-zero
/// status rather than running with a broken configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    /// An environment variable is set but cannot be parsed
    #[error("invalid value for {var}: {value:?}")]
    InvalidVar { var: &'static str, value: String },
}

/// Server configuration
///
/// Read-only after startup; the API key it carries is the only resource
/// shared across call sessions.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    /// OpenAI API key used to open every upstream realtime channel
    pub openai_api_key: String,

    /// Realtime API endpoint (overridable for testing against a local server)
    pub realtime_url: String,
    /// Realtime model requested on connect
    pub realtime_model: String,

    /// Interval between keep-alive firings on the inbound socket
    pub heartbeat_interval: Duration,
    /// Fixed delay before replacing a closed upstream channel
    pub reconnect_delay: Duration,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `OPENAI_API_KEY`
    ///
    /// Optional (with defaults):
    /// - `HOST` (0.0.0.0), `PORT` (5050)
    /// - `OPENAI_REALTIME_URL`, `OPENAI_REALTIME_MODEL`
    /// - `HEARTBEAT_INTERVAL_MS`, `UPSTREAM_RECONNECT_DELAY_MS`
    pub fn from_env() -> Result<Self, ConfigError> {
        let openai_api_key = required_var("OPENAI_API_KEY")?;

        let host = optional_var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_var("PORT")?.unwrap_or(DEFAULT_PORT);

        let realtime_url =
            optional_var("OPENAI_REALTIME_URL").unwrap_or_else(|| OPENAI_REALTIME_URL.to_string());
        let realtime_model = optional_var("OPENAI_REALTIME_MODEL")
            .unwrap_or_else(|| DEFAULT_REALTIME_MODEL.to_string());

        let heartbeat_interval = parse_var::<u64>("HEARTBEAT_INTERVAL_MS")?
            .map(Duration::from_millis)
            .unwrap_or(HEARTBEAT_INTERVAL);
        let reconnect_delay = parse_var::<u64>("UPSTREAM_RECONNECT_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(UPSTREAM_RECONNECT_DELAY);

        Ok(Self {
            host,
            port,
            openai_api_key,
            realtime_url,
            realtime_model,
            heartbeat_interval,
            reconnect_delay,
        })
    }

    /// Get the server address as a string in "host:port" form.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Build the configuration for one upstream AI channel.
    ///
    /// The shared credential is injected here rather than read from process
    /// globals by the channel itself.
    pub fn upstream_config(&self) -> UpstreamConfig {
        UpstreamConfig {
            api_key: self.openai_api_key.clone(),
            url: self.realtime_url.clone(),
            model: self.realtime_model.clone(),
            ..UpstreamConfig::default()
        }
    }
}

/// Read a required environment variable, rejecting empty values.
fn required_var(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVar(name)),
    }
}

/// Read an optional environment variable, treating empty as unset.
fn optional_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

/// Read and parse an optional environment variable.
fn parse_var<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match optional_var(name) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidVar { var: name, value }),
        None => Ok(None),
    }
}
