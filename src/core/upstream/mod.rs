//! Upstream AI channel
//!
//! The bidirectional WebSocket connection to the realtime speech AI session.
//! Each relay session owns exactly one live channel instance at a time; a
//! closed instance is reported to the owning session and replaced wholesale
//! after a fixed delay (the session drives that replacement).

mod channel;
mod config;
mod messages;

pub use channel::{UpstreamChannel, UpstreamError, UpstreamEvent};
pub use config::{
    DEFAULT_REALTIME_MODEL, DEFAULT_TEMPERATURE, DEFAULT_VOICE, OPENAI_REALTIME_URL,
    SYSTEM_INSTRUCTIONS, UPSTREAM_RECONNECT_DELAY, UpstreamConfig,
};
pub use messages::{ClientEvent, ServerEvent, SessionConfig, TurnDetection};
