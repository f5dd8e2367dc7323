//! HTTP and WebSocket route configuration

mod api;
mod ws;

pub use api::create_api_router;
pub use ws::create_media_stream_router;
