//! Media-stream WebSocket endpoint
//!
//! Accepts the telephony-side connection, splits it, and hands the receive
//! half to a [`RelaySession`]. A dedicated sender task owns the transmit
//! half; everything the session or the keep-alive timer wants to send is
//! routed through it as a [`CallFrame`], so frames are serialized without
//! sharing the sink.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use bytes::Bytes;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::state::AppState;

use super::messages::CallFrame;
use super::session::RelaySession;

/// Capacity of the outbound frame channel feeding the sender task.
const FRAME_CHANNEL_CAPACITY: usize = 256;

/// How long to wait for the sender task to drain after the session ends.
const SENDER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Handle a WebSocket upgrade on the media-stream endpoint.
pub async fn media_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("media stream connection request");
    ws.on_upgrade(move |socket| handle_media_stream(socket, state))
}

/// Run one call connection to completion.
async fn handle_media_stream(socket: WebSocket, state: Arc<AppState>) {
    let (sink, receiver) = socket.split();

    let (frame_tx, frame_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
    let mut sender = tokio::spawn(run_sender(sink, frame_rx));

    let (session, upstream_rx) = RelaySession::new(&state.config, frame_tx);
    session.run(receiver, upstream_rx).await;

    // The session's last frame is Close; give the sender a moment to flush
    // it before reclaiming the task.
    if tokio::time::timeout(SENDER_DRAIN_TIMEOUT, &mut sender)
        .await
        .is_err()
    {
        debug!("sender task did not drain in time, aborting");
        sender.abort();
    }

    info!("media stream connection finished");
}

/// Sender task: serialize routed frames onto the socket in order.
///
/// Exits when a close frame is sent or the frame channel is dropped.
async fn run_sender(
    mut sink: SplitSink<WebSocket, Message>,
    mut frame_rx: mpsc::Receiver<CallFrame>,
) {
    while let Some(frame) = frame_rx.recv().await {
        let (message, close_after) = match frame {
            CallFrame::Event(event) => match serde_json::to_string(&event) {
                Ok(json) => (Message::Text(json.into()), false),
                Err(e) => {
                    error!("failed to serialize outbound event: {e}");
                    continue;
                }
            },
            CallFrame::Ping => (Message::Ping(Bytes::new()), false),
            CallFrame::Close => (Message::Close(None), true),
        };

        if let Err(e) = sink.send(message).await {
            debug!("media stream send failed: {e}");
            break;
        }
        if close_after {
            break;
        }
    }
    debug!("media stream sender task ended");
}
