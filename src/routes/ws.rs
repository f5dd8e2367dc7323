//! Media-stream WebSocket route configuration

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::media_stream::media_stream_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the media-stream WebSocket router.
///
/// # Endpoint
///
/// `GET /media-stream` - WebSocket upgrade for the bidirectional audio
/// stream of one call. Each accepted connection gets its own relay session
/// bridging the call to the realtime AI API.
pub fn create_media_stream_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/media-stream", get(media_stream_handler))
        .layer(TraceLayer::new_for_http())
}
