//! Upstream AI channel implementation.
//!
//! One `UpstreamChannel` represents one WebSocket connection attempt to the
//! realtime API: `Connecting -> Open -> Closed`, with no internal retry. When
//! the connection ends for any reason the channel reports
//! [`UpstreamEvent::Closed`] to its owning session and its task exits; the
//! session decides whether to create a replacement instance. A closed
//! instance is never reused.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::{SinkExt, StreamExt};
use http::header::AUTHORIZATION;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::config::UpstreamConfig;
use super::messages::{ClientEvent, ServerEvent, SessionConfig};

/// Channel capacity for outbound client events.
const CMD_CHANNEL_CAPACITY: usize = 256;

/// Errors surfaced by the upstream channel.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The channel is not open; the frame should be dropped by the caller
    #[error("upstream channel is not open")]
    NotOpen,

    /// The WebSocket handshake request could not be built
    #[error("handshake request error: {0}")]
    Handshake(String),
}

/// Events reported by the channel to its owning session.
#[derive(Debug)]
pub enum UpstreamEvent {
    /// Non-control audio output fragment (base64, relayed untouched)
    AudioDelta(String),

    /// The connection ended (handshake failure, server close, or requested
    /// close). Sent exactly once, as the channel task's last act.
    Closed,
}

/// Handle to one upstream connection instance.
pub struct UpstreamChannel {
    /// Outbound client events to the connection task
    cmd_tx: mpsc::Sender<ClientEvent>,
    /// Open flag for lock-free checks, shared with the connection task
    open: Arc<AtomicBool>,
    /// Cancelling this token requests a clean close of this instance
    closer: CancellationToken,
    /// Connection task handle
    task: JoinHandle<()>,
}

impl UpstreamChannel {
    /// Open a new channel instance.
    ///
    /// Returns immediately; the connection is established by a spawned task.
    /// Lifecycle notifications and audio deltas arrive on `event_tx`. The
    /// `closer` token should be a child of the owning session's token so the
    /// instance cannot outlive its session.
    pub fn spawn(
        config: UpstreamConfig,
        event_tx: mpsc::Sender<UpstreamEvent>,
        closer: CancellationToken,
    ) -> Self {
        let open = Arc::new(AtomicBool::new(false));
        let (cmd_tx, cmd_rx) = mpsc::channel(CMD_CHANNEL_CAPACITY);

        let task = tokio::spawn(run_channel(
            config,
            cmd_rx,
            event_tx,
            open.clone(),
            closer.clone(),
        ));

        Self {
            cmd_tx,
            open,
            closer,
            task,
        }
    }

    /// Whether the connection is currently open.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Forward a base64 audio payload as an append-audio command.
    ///
    /// Fails with [`UpstreamError::NotOpen`] when the connection is not open;
    /// callers treat that as a silent drop, not a session error.
    pub async fn append_audio(&self, audio: String) -> Result<(), UpstreamError> {
        if !self.is_open() {
            return Err(UpstreamError::NotOpen);
        }
        self.cmd_tx
            .send(ClientEvent::InputAudioBufferAppend { audio })
            .await
            .map_err(|_| UpstreamError::NotOpen)
    }

    /// Request a clean close of this instance. Idempotent.
    pub fn close(&self) {
        self.closer.cancel();
    }

    /// Whether a close has been requested for this instance.
    pub fn is_closing(&self) -> bool {
        self.closer.is_cancelled()
    }

    /// Test-only handle with a controllable open flag and an inspectable
    /// command stream, no socket behind it.
    #[cfg(test)]
    pub(crate) fn stub(open: bool) -> (Self, mpsc::Receiver<ClientEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(CMD_CHANNEL_CAPACITY);
        let channel = Self {
            cmd_tx,
            open: Arc::new(AtomicBool::new(open)),
            closer: CancellationToken::new(),
            task: tokio::spawn(async {}),
        };
        (channel, cmd_rx)
    }
}

impl Drop for UpstreamChannel {
    fn drop(&mut self) {
        // A superseded instance must not linger once its handle is discarded.
        self.closer.cancel();
        self.task.abort();
    }
}

/// Build the WebSocket handshake request with auth headers.
fn build_request(
    config: &UpstreamConfig,
) -> Result<http::Request<()>, UpstreamError> {
    let mut request = config
        .ws_url()
        .into_client_request()
        .map_err(|e| UpstreamError::Handshake(e.to_string()))?;

    let bearer = format!("Bearer {}", config.api_key);
    let auth = bearer
        .parse()
        .map_err(|_| UpstreamError::Handshake("invalid API key characters".to_string()))?;
    request.headers_mut().insert(AUTHORIZATION, auth);
    request.headers_mut().insert(
        "OpenAI-Beta",
        http::HeaderValue::from_static("realtime=v1"),
    );

    Ok(request)
}

/// Connection task: connect, configure the session once, pump messages until
/// the connection ends, then report `Closed`.
async fn run_channel(
    config: UpstreamConfig,
    mut cmd_rx: mpsc::Receiver<ClientEvent>,
    event_tx: mpsc::Sender<UpstreamEvent>,
    open: Arc<AtomicBool>,
    closer: CancellationToken,
) {
    let request = match build_request(&config) {
        Ok(request) => request,
        Err(e) => {
            error!("failed to build upstream handshake request: {e}");
            let _ = event_tx.send(UpstreamEvent::Closed).await;
            return;
        }
    };

    let ws_stream = tokio::select! {
        _ = closer.cancelled() => {
            debug!("upstream connect cancelled");
            let _ = event_tx.send(UpstreamEvent::Closed).await;
            return;
        }
        result = tokio_tungstenite::connect_async(request) => match result {
            Ok((stream, _response)) => stream,
            Err(e) => {
                warn!("upstream connect failed: {e}");
                let _ = event_tx.send(UpstreamEvent::Closed).await;
                return;
            }
        }
    };

    info!("connected to realtime API");
    open.store(true, Ordering::SeqCst);

    let (mut ws_sink, mut ws_stream) = ws_stream.split();

    // One-time session configuration; never repeated on this connection.
    let session_update = ClientEvent::SessionUpdate {
        session: SessionConfig::from_upstream(&config),
    };
    let configured = match serde_json::to_string(&session_update) {
        Ok(json) => match ws_sink.send(Message::Text(json.into())).await {
            Ok(()) => true,
            Err(e) => {
                warn!("failed to send session configuration: {e}");
                false
            }
        },
        Err(e) => {
            error!("failed to serialize session configuration: {e}");
            false
        }
    };

    if configured {
        loop {
            tokio::select! {
                _ = closer.cancelled() => {
                    debug!("closing upstream channel");
                    let _ = ws_sink.send(Message::Close(None)).await;
                    break;
                }

                Some(event) = cmd_rx.recv() => {
                    let json = match serde_json::to_string(&event) {
                        Ok(json) => json,
                        Err(e) => {
                            error!("failed to serialize client event: {e}");
                            continue;
                        }
                    };
                    if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                        error!("failed to send upstream message: {e}");
                        break;
                    }
                }

                msg = ws_stream.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_server_message(&text, &event_tx).await;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                            error!("failed to send pong: {e}");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("upstream connection closed by server");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("upstream websocket error: {e}");
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    open.store(false, Ordering::SeqCst);
    let _ = event_tx.send(UpstreamEvent::Closed).await;
    debug!("upstream channel task ended");
}

/// Parse and dispatch one server message.
///
/// Error events are logged and do not close the connection; closure is driven
/// solely by the transport-level close transition. Malformed payloads are
/// logged and dropped.
async fn handle_server_message(text: &str, event_tx: &mpsc::Sender<UpstreamEvent>) {
    match serde_json::from_str::<ServerEvent>(text) {
        Ok(ServerEvent::AudioDelta { delta }) => {
            let _ = event_tx.send(UpstreamEvent::AudioDelta(delta)).await;
        }
        Ok(ServerEvent::Error { error }) => {
            error!(
                error_type = %error.error_type,
                "realtime API error: {}",
                error.message
            );
        }
        Ok(ServerEvent::Other) => {
            trace!("ignoring upstream event");
        }
        Err(e) => {
            error!("failed to parse upstream event: {e}");
        }
    }
}
