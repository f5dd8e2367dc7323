//! Upstream channel configuration.
//!
//! The relay drives a single fixed realtime session shape: G.711 µ-law audio
//! both ways, server-side voice activity detection, one synthetic voice and
//! one instruction string. These are policy constants, overridable through
//! `ServerConfig` where deployments need to tune them.

use std::time::Duration;

/// OpenAI Realtime API WebSocket endpoint.
pub const OPENAI_REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";

/// Realtime model requested when connecting.
pub const DEFAULT_REALTIME_MODEL: &str = "gpt-4o-realtime-preview-2024-10-01";

/// Synthetic voice used for audio output.
pub const DEFAULT_VOICE: &str = "alloy";

/// System instruction sent with the session configuration.
pub const SYSTEM_INSTRUCTIONS: &str = "You are a helpful AI assistant.";

/// Response randomness for the realtime session.
pub const DEFAULT_TEMPERATURE: f32 = 0.8;

/// Audio encoding used in both directions (matches the telephony side).
pub const AUDIO_FORMAT: &str = "g711_ulaw";

/// Fixed delay before a closed upstream channel is replaced.
pub const UPSTREAM_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Configuration for one upstream AI channel.
///
/// The API key is injected explicitly by the caller; the channel never reads
/// process-wide state.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Bearer credential for the realtime endpoint
    pub api_key: String,
    /// WebSocket endpoint URL (without the model query parameter)
    pub url: String,
    /// Model requested on connect
    pub model: String,
    /// Synthetic voice identity
    pub voice: String,
    /// System instruction string
    pub instructions: String,
    /// Response randomness
    pub temperature: f32,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            url: OPENAI_REALTIME_URL.to_string(),
            model: DEFAULT_REALTIME_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            instructions: SYSTEM_INSTRUCTIONS.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl UpstreamConfig {
    /// Build the WebSocket URL with the model parameter.
    pub fn ws_url(&self) -> String {
        format!("{}?model={}", self.url, self.model)
    }
}
