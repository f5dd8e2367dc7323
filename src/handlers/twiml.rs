//! Call-setup endpoint
//!
//! The telephony provider fetches this endpoint when a call comes in and
//! gets back a TwiML document instructing it to open the media stream back
//! to this server. The stream URL is derived from the request's Host header
//! so the document works behind whatever hostname the provider dialed.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Response};
use tracing::info;

use crate::state::AppState;

/// Respond to an incoming call with the stream-connect document.
///
/// Providers may use GET or POST for the webhook, so the route accepts any
/// method.
pub async fn incoming_call(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| state.config.address());

    info!(host = %host, "incoming call");

    (
        [(header::CONTENT_TYPE, "text/xml")],
        twiml_response(&host),
    )
        .into_response()
}

/// Build the TwiML document pointing the caller's audio at the
/// media-stream endpoint.
fn twiml_response(host: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Response>
    <Say>Connecting you to the AI assistant.</Say>
    <Pause length="1"/>
    <Connect>
        <Stream url="wss://{host}/media-stream" />
    </Connect>
</Response>"#
    )
}
