//! Per-call relay session
//!
//! One `RelaySession` exists per accepted media-stream connection. It owns
//! the inbound call channel, exactly one live upstream AI channel, and the
//! keep-alive timer, and it translates events between the two wire
//! vocabularies. All session state is mutated from a single `tokio::select!`
//! loop, so handlers never run concurrently for the same session.
//!
//! Teardown is keyed off one cancellation token: `stop`, inbound close, and
//! inbound errors all cancel it (idempotently), which stops the heartbeat,
//! closes the upstream channel, and suppresses any pending reconnect.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::StreamExt;
use futures::stream::SplitStream;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::core::upstream::{UpstreamChannel, UpstreamConfig, UpstreamEvent};

use super::heartbeat;
use super::messages::{CallFrame, InboundEvent, OutboundEvent};

/// Channel capacity for upstream-to-session events.
const UPSTREAM_EVENT_CAPACITY: usize = 256;

/// The relay session for one call.
pub struct RelaySession {
    /// Per-call identifier for log correlation
    call_id: Uuid,
    /// Stream identifier assigned by the telephony side; unset until `start`.
    /// Shared with the heartbeat task, which tags silence frames with it.
    stream_sid: Arc<RwLock<Option<String>>>,
    /// Most recent inbound media timestamp; tracked, informational
    latest_media_timestamp: u64,
    /// Outbound frames to the inbound socket's sender task
    frame_tx: mpsc::Sender<CallFrame>,
    /// The live upstream channel instance; replaced wholesale on reconnect
    upstream: UpstreamChannel,
    /// Sender handed to each upstream channel instance
    upstream_tx: mpsc::Sender<UpstreamEvent>,
    /// Configuration for (re)opening upstream channels
    upstream_config: UpstreamConfig,
    /// Fixed delay before a closed upstream channel is replaced
    reconnect_delay: Duration,
    /// Session-wide teardown token; cancelled exactly once
    shutdown: CancellationToken,
    /// Keep-alive task handle
    heartbeat: JoinHandle<()>,
}

impl RelaySession {
    /// Create the session: open the upstream channel and start the heartbeat.
    ///
    /// Returns the session together with the receiver for upstream events,
    /// which the caller passes back into [`RelaySession::run`].
    pub fn new(
        config: &ServerConfig,
        frame_tx: mpsc::Sender<CallFrame>,
    ) -> (Self, mpsc::Receiver<UpstreamEvent>) {
        let call_id = Uuid::new_v4();
        let shutdown = CancellationToken::new();
        let stream_sid = Arc::new(RwLock::new(None));
        let upstream_config = config.upstream_config();

        let (upstream_tx, upstream_rx) = mpsc::channel(UPSTREAM_EVENT_CAPACITY);
        let upstream = UpstreamChannel::spawn(
            upstream_config.clone(),
            upstream_tx.clone(),
            shutdown.child_token(),
        );

        let heartbeat = heartbeat::spawn(
            config.heartbeat_interval,
            frame_tx.clone(),
            stream_sid.clone(),
            shutdown.clone(),
        );

        info!(call_id = %call_id, "relay session created");

        let session = Self {
            call_id,
            stream_sid,
            latest_media_timestamp: 0,
            frame_tx,
            upstream,
            upstream_tx,
            upstream_config,
            reconnect_delay: config.reconnect_delay,
            shutdown,
            heartbeat,
        };
        (session, upstream_rx)
    }

    /// Run the session until the call ends, then tear everything down.
    ///
    /// Inbound events and upstream events are each processed in arrival
    /// order; there is no ordering guarantee between the two streams.
    pub async fn run(
        mut self,
        mut receiver: SplitStream<WebSocket>,
        mut upstream_rx: mpsc::Receiver<UpstreamEvent>,
    ) {
        // Armed when the upstream channel closes while the session is live;
        // a pending deadline never survives teardown.
        let mut reconnect_at: Option<Instant> = None;

        loop {
            let deadline = reconnect_at;
            let reconnect_timer = async move {
                match deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                msg = receiver.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        if !self.handle_inbound_text(&text).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!(call_id = %self.call_id, "inbound connection closed by peer");
                        break;
                    }
                    Some(Ok(_)) => {
                        // Binary frames and pongs are not part of the protocol
                        trace!(call_id = %self.call_id, "ignoring non-text inbound frame");
                    }
                    Some(Err(e)) => {
                        warn!(call_id = %self.call_id, "inbound websocket error: {e}");
                        break;
                    }
                    None => {
                        info!(call_id = %self.call_id, "inbound connection closed");
                        break;
                    }
                },

                Some(event) = upstream_rx.recv() => match event {
                    UpstreamEvent::AudioDelta(delta) => {
                        self.forward_audio_delta(delta).await;
                    }
                    UpstreamEvent::Closed => {
                        if self.shutdown.is_cancelled() {
                            debug!(call_id = %self.call_id, "upstream closed during teardown");
                        } else {
                            warn!(
                                call_id = %self.call_id,
                                "upstream channel closed, reconnecting in {:?}",
                                self.reconnect_delay
                            );
                            reconnect_at = Some(Instant::now() + self.reconnect_delay);
                        }
                    }
                },

                _ = reconnect_timer => {
                    reconnect_at = None;
                    self.reopen_upstream();
                }
            }
        }

        self.teardown().await;
    }

    /// Parse and dispatch one inbound text frame.
    ///
    /// Returns `false` when the session should tear down (`stop` event).
    /// Malformed payloads are logged and dropped; the connection stays open.
    async fn handle_inbound_text(&mut self, text: &str) -> bool {
        match serde_json::from_str::<InboundEvent>(text) {
            Ok(event) => self.handle_inbound_event(event).await,
            Err(e) => {
                error!(call_id = %self.call_id, "failed to parse inbound event: {e}");
                true
            }
        }
    }

    /// Apply one inbound event to the session.
    async fn handle_inbound_event(&mut self, event: InboundEvent) -> bool {
        match event {
            InboundEvent::Start { start } => {
                info!(call_id = %self.call_id, stream_sid = %start.stream_sid, "stream started");
                *self.stream_sid.write().await = Some(start.stream_sid);
                true
            }

            InboundEvent::Media { media } => {
                self.latest_media_timestamp = media.timestamp;
                if self.upstream.is_open() {
                    if let Err(e) = self.upstream.append_audio(media.payload).await {
                        debug!(call_id = %self.call_id, "dropping media frame: {e}");
                    }
                } else {
                    debug!(call_id = %self.call_id, "upstream not open, dropping media frame");
                }
                true
            }

            InboundEvent::Stop => {
                info!(call_id = %self.call_id, "stream stopped");
                false
            }

            InboundEvent::Unrecognized => {
                debug!(call_id = %self.call_id, "unrecognized inbound event");
                true
            }
        }
    }

    /// Forward an upstream audio fragment to the inbound side.
    ///
    /// Dropped when empty, and dropped while the stream identifier is still
    /// unset: a frame without its identifier would be malformed.
    async fn forward_audio_delta(&self, delta: String) {
        if delta.is_empty() {
            trace!(call_id = %self.call_id, "dropping empty audio delta");
            return;
        }
        let Some(stream_sid) = self.stream_sid.read().await.clone() else {
            debug!(call_id = %self.call_id, "dropping audio delta before stream start");
            return;
        };
        let frame = OutboundEvent::media(stream_sid, delta);
        if self.frame_tx.send(CallFrame::Event(frame)).await.is_err() {
            debug!(call_id = %self.call_id, "inbound channel gone, dropping audio delta");
        }
    }

    /// Replace the closed upstream channel with a brand-new instance.
    ///
    /// Checks the teardown token first so a reconnect scheduled before
    /// teardown can never produce an orphaned channel.
    fn reopen_upstream(&mut self) {
        if self.shutdown.is_cancelled() {
            debug!(call_id = %self.call_id, "skipping reconnect, session tearing down");
            return;
        }
        info!(call_id = %self.call_id, "reopening upstream channel");
        self.upstream = UpstreamChannel::spawn(
            self.upstream_config.clone(),
            self.upstream_tx.clone(),
            self.shutdown.child_token(),
        );
    }

    /// Tear the session down. Safe to reach from every exit path: the token
    /// cancels at most once, stopping the heartbeat, closing the upstream
    /// channel, and suppressing further reconnects.
    async fn teardown(&mut self) {
        self.shutdown.cancel();
        self.heartbeat.abort();
        self.upstream.close();
        let _ = self.frame_tx.send(CallFrame::Close).await;
        info!(call_id = %self.call_id, "relay session torn down");
    }
}
