//! Keep-alive timer for the inbound call channel.
//!
//! Some telephony gateways drop a media stream that goes quiet, so every
//! tick sends a silence media frame (once the stream identifier is known)
//! plus a transport-level ping. The task runs for the whole session and
//! stops when the session's teardown token cancels.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::messages::{CallFrame, OutboundEvent};

/// Spawn the keep-alive task.
///
/// `stream_sid` is shared with the session; silence frames are suppressed
/// while it is unset because they could not carry a stream identifier yet.
/// The ping is sent unconditionally.
pub fn spawn(
    interval: Duration,
    frame_tx: mpsc::Sender<CallFrame>,
    stream_sid: Arc<RwLock<Option<String>>>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it so beats start one
        // full interval after session creation.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("keep-alive task stopping");
                    break;
                }
                _ = ticker.tick() => {
                    if let Some(sid) = stream_sid.read().await.clone() {
                        let frame = CallFrame::Event(OutboundEvent::silence(sid));
                        if frame_tx.send(frame).await.is_err() {
                            break;
                        }
                    } else {
                        trace!("skipping silence frame, stream not started");
                    }
                    if frame_tx.send(CallFrame::Ping).await.is_err() {
                        break;
                    }
                }
            }
        }
    })
}
