//! Test helpers for integration tests
//!
//! Spawns an in-process websocket server that plays the gateway's side of
//! the protocol, handing each accepted connection to the test as a
//! [`ServerConn`] it can script frame by frame.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::frame::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

/// How long a scripted expectation may wait before the test fails
const STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// An in-process gateway server.
///
/// Accepts any number of connections (the client reconnects during most
/// scenarios) and queues them for the test to script.
pub struct TestGateway {
    /// URL the client should be pointed at
    pub url: String,
    accepted: mpsc::Receiver<ServerConn>,
    _accept_task: JoinHandle<()>,
}

impl TestGateway {
    /// Bind a listener and start accepting connections.
    pub async fn spawn() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (tx, rx) = mpsc::channel(8);

        let accept_task = tokio::spawn(async move {
            while let Ok((tcp, _)) = listener.accept().await {
                match accept_async(tcp).await {
                    Ok(ws) => {
                        if tx.send(ServerConn { ws }).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => eprintln!("test gateway handshake failed: {e}"),
                }
            }
        });

        Ok(Self {
            url: format!("ws://{addr}"),
            accepted: rx,
            _accept_task: accept_task,
        })
    }

    /// Wait for the client's next connection.
    pub async fn next_conn(&mut self) -> Result<ServerConn> {
        tokio::time::timeout(STEP_TIMEOUT, self.accepted.recv())
            .await
            .context("timed out waiting for the client to connect")?
            .context("accept loop gone")
    }
}

/// One accepted connection, scripted from the server's point of view.
pub struct ServerConn {
    ws: WebSocketStream<TcpStream>,
}

impl ServerConn {
    /// Send a raw frame.
    pub async fn send_frame(&mut self, frame: Value) -> Result<()> {
        self.ws.send(Message::Text(frame.to_string())).await?;
        Ok(())
    }

    /// Send HELLO with the given heartbeat interval.
    pub async fn send_hello(&mut self, heartbeat_interval_ms: u64) -> Result<()> {
        self.send_frame(json!({
            "op": 10,
            "d": { "heartbeat_interval": heartbeat_interval_ms },
        }))
        .await
    }

    /// Send a dispatch frame.
    pub async fn send_dispatch(&mut self, event: &str, sequence: u64, data: Value) -> Result<()> {
        self.send_frame(json!({ "op": 0, "t": event, "s": sequence, "d": data }))
            .await
    }

    /// Send READY with a session identity pointing back at this server.
    pub async fn send_ready(&mut self, session_id: &str, resume_url: &str, sequence: u64) -> Result<()> {
        self.send_dispatch(
            "READY",
            sequence,
            json!({
                "session_id": session_id,
                "resume_gateway_url": resume_url,
                "user": { "id": "bot-user", "bot": true },
            }),
        )
        .await
    }

    /// Receive the next text frame as JSON.
    pub async fn recv_frame(&mut self) -> Result<Value> {
        loop {
            let message = tokio::time::timeout(STEP_TIMEOUT, self.ws.next())
                .await
                .context("timed out waiting for a client frame")?
                .context("connection ended")??;

            match message {
                Message::Text(text) => return Ok(serde_json::from_str(&text)?),
                Message::Ping(_) | Message::Pong(_) => {}
                Message::Close(frame) => bail!("client closed the connection: {frame:?}"),
                other => bail!("unexpected frame from client: {other:?}"),
            }
        }
    }

    /// Receive the next frame and assert its opcode.
    pub async fn expect_op(&mut self, op: u64) -> Result<Value> {
        let frame = self.recv_frame().await?;
        let got = frame["op"].as_u64().context("frame without op")?;
        if got != op {
            bail!("expected op {op}, got frame {frame}");
        }
        Ok(frame)
    }

    /// Close the connection with a gateway close code.
    pub async fn close_with(mut self, code: u16, reason: &str) -> Result<()> {
        self.ws
            .send(Message::Close(Some(CloseFrame {
                code: WsCloseCode::Library(code),
                reason: reason.to_string().into(),
            })))
            .await?;
        // Drain until the peer acknowledges the close
        while let Some(Ok(_)) = self.ws.next().await {}
        Ok(())
    }

    /// Drop the TCP connection without a close frame (network failure).
    pub fn drop_abruptly(self) {
        drop(self.ws);
    }
}
