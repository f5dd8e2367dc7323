//! REST route configuration

use axum::{Router, routing::any};
use tower_http::trace::TraceLayer;

use crate::handlers::twiml;
use crate::state::AppState;
use std::sync::Arc;

/// Create the REST router.
///
/// # Endpoints
///
/// `ANY /incoming-call` - call-setup webhook returning the TwiML document
/// that connects the caller's audio to the media-stream endpoint. Accepts
/// any method because providers are configured with either GET or POST.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/incoming-call", any(twiml::incoming_call))
        .layer(TraceLayer::new_for_http())
}
