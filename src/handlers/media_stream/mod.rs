//! Media-stream WebSocket handling
//!
//! This module implements the inbound call channel and the per-call relay
//! session: the telephony side opens a WebSocket here, and the session
//! bridges it to an upstream realtime AI channel for the duration of the
//! call.

mod handler;
mod heartbeat;
mod messages;
mod session;

pub use handler::media_stream_handler;
pub use messages::{CallFrame, InboundEvent, OutboundEvent, SILENCE_PAYLOAD};
pub use session::RelaySession;
