//! OpenAI Realtime API WebSocket message types.
//!
//! Only the slice of the protocol the relay speaks is modelled here.
//!
//! Client events (sent to server):
//! - session.update - configure the session, sent once per connection
//! - input_audio_buffer.append - append caller audio to the input buffer
//!
//! Server events (received from server):
//! - response.audio.delta - incremental chunk of synthesized audio
//! - error - provider-reported error
//! - everything else is recognized-but-ignored (`Other`)

use serde::{Deserialize, Serialize};

use super::config::{AUDIO_FORMAT, UpstreamConfig};

// =============================================================================
// Session Configuration
// =============================================================================

/// Session configuration for the realtime API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Response modalities (text, audio)
    pub modalities: Vec<String>,

    /// System instructions for the assistant
    pub instructions: String,

    /// Voice for audio output
    pub voice: String,

    /// Input audio format
    pub input_audio_format: String,

    /// Output audio format
    pub output_audio_format: String,

    /// Turn detection configuration
    pub turn_detection: TurnDetection,

    /// Temperature for response generation
    pub temperature: f32,
}

impl SessionConfig {
    /// Build the one-time session configuration from the channel config.
    pub fn from_upstream(config: &UpstreamConfig) -> Self {
        Self {
            modalities: vec!["text".to_string(), "audio".to_string()],
            instructions: config.instructions.clone(),
            voice: config.voice.clone(),
            input_audio_format: AUDIO_FORMAT.to_string(),
            output_audio_format: AUDIO_FORMAT.to_string(),
            turn_detection: TurnDetection::ServerVad,
            temperature: config.temperature,
        }
    }
}

/// Turn detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TurnDetection {
    /// Server-side voice activity detection
    #[serde(rename = "server_vad")]
    ServerVad,
}

// =============================================================================
// Client Events (sent to server)
// =============================================================================

/// Client events sent to the realtime API.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Update session configuration
    #[serde(rename = "session.update")]
    SessionUpdate {
        /// Session configuration
        session: SessionConfig,
    },

    /// Append audio to the input buffer
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        /// Base64-encoded audio data, relayed untouched from the caller
        audio: String,
    },
}

// =============================================================================
// Server Events (received from server)
// =============================================================================

/// Server events received from the realtime API.
///
/// Unknown event types deserialize into `Other` so they can be ignored
/// without being mistaken for malformed payloads.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Incremental chunk of synthesized audio output
    #[serde(rename = "response.audio.delta")]
    AudioDelta {
        /// Base64-encoded audio fragment
        delta: String,
    },

    /// Error reported by the provider
    #[serde(rename = "error")]
    Error {
        /// Error details
        error: ApiError,
    },

    /// Any other event type; ignored by the relay
    #[serde(other)]
    Other,
}

/// Error details from the realtime API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    /// Error type
    #[serde(rename = "type", default)]
    pub error_type: String,
    /// Human-readable message
    #[serde(default)]
    pub message: String,
}
