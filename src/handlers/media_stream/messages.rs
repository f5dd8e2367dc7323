//! Media-stream wire protocol message types
//!
//! Events on the telephony side are JSON objects discriminated by an `event`
//! field. Inbound events are modelled as a tagged enum with an explicit
//! catch-all for unrecognized discriminators; payloads that carry a known
//! discriminator but fail to parse are malformed, which is a distinct
//! outcome (logged, dropped, connection kept alive).

use serde::{Deserialize, Serialize};

/// Pre-encoded G.711 µ-law silence, used for keep-alive media frames.
pub const SILENCE_PAYLOAD: &str = "UklGRgA=";

// =============================================================================
// Inbound Events (telephony side -> relay)
// =============================================================================

/// Inbound events received on the media-stream socket.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum InboundEvent {
    /// The audio stream has started; carries the stream identifier
    Start {
        /// Stream metadata
        start: StartMeta,
    },

    /// One inbound audio frame
    Media {
        /// Audio frame payload
        media: MediaPayload,
    },

    /// The audio stream has ended; normal termination path
    Stop,

    /// Any other discriminator; logged at low severity, never fatal
    #[serde(other)]
    Unrecognized,
}

/// Metadata carried by the `start` event.
#[derive(Debug, Deserialize)]
pub struct StartMeta {
    /// Opaque stream identifier assigned by the telephony side
    #[serde(rename = "streamSid")]
    pub stream_sid: String,
}

/// Payload of an inbound `media` event.
#[derive(Debug, Deserialize)]
pub struct MediaPayload {
    /// Base64-encoded audio, relayed to the upstream channel untouched
    pub payload: String,
    /// Frame timestamp in milliseconds; tracked, not used for ordering
    #[serde(default)]
    pub timestamp: u64,
}

// =============================================================================
// Outbound Events (relay -> telephony side)
// =============================================================================

/// Outbound events sent on the media-stream socket.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum OutboundEvent {
    /// One outbound audio frame, addressed by stream identifier
    Media {
        /// Stream identifier the frame belongs to
        #[serde(rename = "streamSid")]
        stream_sid: String,
        /// Audio frame payload
        media: OutboundMedia,
    },
}

/// Payload of an outbound `media` event.
#[derive(Debug, Serialize)]
pub struct OutboundMedia {
    /// Base64-encoded audio
    pub payload: String,
}

impl OutboundEvent {
    /// Build a media frame carrying an audio payload.
    pub fn media(stream_sid: String, payload: String) -> Self {
        Self::Media {
            stream_sid,
            media: OutboundMedia { payload },
        }
    }

    /// Build a keep-alive frame carrying pre-encoded silence.
    pub fn silence(stream_sid: String) -> Self {
        Self::media(stream_sid, SILENCE_PAYLOAD.to_string())
    }
}

// =============================================================================
// Sender Routing
// =============================================================================

/// Frames routed to the inbound socket's dedicated sender task.
#[derive(Debug)]
pub enum CallFrame {
    /// JSON event frame
    Event(OutboundEvent),
    /// Transport-level liveness probe
    Ping,
    /// Close the connection
    Close,
}
