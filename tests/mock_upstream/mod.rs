//! In-process mock of the realtime API WebSocket endpoint
//!
//! Accepts connections, records the handshake headers, parses client text
//! frames into JSON, and lets the test inject server frames or close the
//! connection. One `MockConnection` handle per accepted connection, in
//! accept order.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};

const STEP_TIMEOUT: Duration = Duration::from_secs(2);

pub struct MockUpstream {
    addr: SocketAddr,
    conn_rx: mpsc::UnboundedReceiver<MockConnection>,
    accepted: Arc<AtomicUsize>,
}

impl MockUpstream {
    /// Bind an ephemeral port and start accepting connections.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock upstream");
        let addr = listener.local_addr().expect("mock upstream local addr");
        let accepted = Arc::new(AtomicUsize::new(0));
        let (conn_tx, conn_rx) = mpsc::unbounded_channel();

        let accept_counter = accepted.clone();
        tokio::spawn(async move {
            while let Ok((stream, _peer)) = listener.accept().await {
                let conn_tx = conn_tx.clone();
                let accept_counter = accept_counter.clone();
                tokio::spawn(async move {
                    handle_connection(stream, conn_tx, accept_counter).await;
                });
            }
        });

        Self {
            addr,
            conn_rx,
            accepted,
        }
    }

    /// Endpoint URL to hand to the relay configuration.
    pub fn url(&self) -> String {
        format!("ws://{}/v1/realtime", self.addr)
    }

    /// Wait for the next accepted connection.
    pub async fn next_connection(&mut self) -> MockConnection {
        tokio::time::timeout(STEP_TIMEOUT, self.conn_rx.recv())
            .await
            .expect("timed out waiting for upstream connection")
            .expect("mock upstream stopped")
    }

    /// Total connections accepted so far.
    pub fn connection_count(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

pub struct MockConnection {
    /// Value of the Authorization header sent during the handshake
    pub authorization: Option<String>,
    /// Value of the OpenAI-Beta header sent during the handshake
    pub beta_header: Option<String>,
    /// Request URI, including the query string
    pub uri: String,
    event_rx: mpsc::UnboundedReceiver<Value>,
    outgoing: Option<mpsc::UnboundedSender<Message>>,
}

impl MockConnection {
    /// Wait for the next JSON event from the relay.
    pub async fn next_event(&mut self) -> Value {
        tokio::time::timeout(STEP_TIMEOUT, self.event_rx.recv())
            .await
            .expect("timed out waiting for client event")
            .expect("connection closed while waiting for client event")
    }

    /// Push a server event to the relay.
    pub fn send(&self, value: Value) {
        self.outgoing
            .as_ref()
            .expect("connection already closed")
            .send(Message::Text(value.to_string().into()))
            .expect("connection task gone");
    }

    /// Close the connection from the server side.
    pub fn close(&mut self) {
        self.outgoing.take();
    }

    /// Wait until the relay side of the connection has gone away.
    pub async fn wait_closed(&mut self) {
        loop {
            match tokio::time::timeout(STEP_TIMEOUT, self.event_rx.recv()).await {
                Ok(Some(_)) => continue,
                Ok(None) => return,
                Err(_) => panic!("timed out waiting for connection to close"),
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    conn_tx: mpsc::UnboundedSender<MockConnection>,
    accepted: Arc<AtomicUsize>,
) {
    let mut authorization = None;
    let mut beta_header = None;
    let mut uri = String::new();

    let capture = |request: &Request, response: Response| {
        authorization = request
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        beta_header = request
            .headers()
            .get("openai-beta")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        uri = request.uri().to_string();
        Ok(response)
    };

    let ws = match tokio_tungstenite::accept_hdr_async(stream, capture).await {
        Ok(ws) => ws,
        Err(_) => return,
    };
    accepted.fetch_add(1, Ordering::SeqCst);

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel();

    if conn_tx
        .send(MockConnection {
            authorization,
            beta_header,
            uri,
            event_rx,
            outgoing: Some(out_tx),
        })
        .is_err()
    {
        return;
    }

    let (mut sink, mut source) = ws.split();
    loop {
        tokio::select! {
            out = out_rx.recv() => match out {
                Some(msg) => {
                    if sink.send(msg).await.is_err() {
                        break;
                    }
                }
                // Test dropped its sender: close the connection server-side
                None => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            },
            msg = source.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    if let Ok(value) = serde_json::from_str(text.as_str()) {
                        if event_tx.send(value).is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(_)) => break,
            }
        }
    }
}
