//! Transport socket
//!
//! Thin wrapper over a text-framed websocket: dial, send, receive, close.
//! Failures surface as typed errors so the connection manager can tell a
//! dead socket from a misbehaving one. Control frames (ping/pong) are
//! handled below this layer and never reach the dispatcher.

use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, Stream, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// The underlying websocket stream type
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long a dial may take before it is abandoned
const DIAL_TIMEOUT: Duration = Duration::from_secs(15);

/// Transport failure classification
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer closed the connection (possibly with a gateway close code)
    #[error("connection closed (code {code:?}): {reason}")]
    Closed { code: Option<u16>, reason: String },

    /// Dial did not complete in time
    #[error("dial timed out after {0:?}")]
    DialTimeout(Duration),

    /// The peer sent something this protocol does not allow
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// Underlying websocket error (reset, io, tls)
    #[error("websocket error: {0}")]
    Ws(#[from] WsError),
}

impl TransportError {
    /// Gateway close code, when the peer sent one.
    #[must_use]
    pub fn close_code(&self) -> Option<u16> {
        match self {
            Self::Closed { code, .. } => *code,
            _ => None,
        }
    }
}

/// A dialed, full-duplex gateway socket.
///
/// Owned whole during the handshake, then split into halves so the read
/// loop and the writer task can run concurrently.
pub struct Transport {
    stream: WsStream,
}

impl Transport {
    /// Dial the gateway at `url`.
    pub async fn dial(url: &str) -> Result<Self, TransportError> {
        let (stream, _response) = tokio::time::timeout(DIAL_TIMEOUT, connect_async(url))
            .await
            .map_err(|_| TransportError::DialTimeout(DIAL_TIMEOUT))??;

        tracing::debug!(url, "websocket connected");
        Ok(Self { stream })
    }

    /// Send one text frame.
    pub async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.stream.send(Message::Text(text)).await?;
        Ok(())
    }

    /// Receive the next text frame, skipping control frames.
    pub async fn receive(&mut self) -> Result<String, TransportError> {
        next_text(&mut self.stream).await
    }

    /// Close the socket gracefully.
    pub async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }

    /// Split into independent write and read halves.
    #[must_use]
    pub fn split(self) -> (TransportWriter, TransportReader) {
        let (sink, stream) = self.stream.split();
        (TransportWriter { sink }, TransportReader { stream })
    }
}

/// Write half of a split transport
pub struct TransportWriter {
    sink: SplitSink<WsStream, Message>,
}

impl TransportWriter {
    /// Send one text frame.
    pub async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.sink.send(Message::Text(text)).await?;
        Ok(())
    }

    /// Send a close frame and shut the write half down.
    pub async fn close(&mut self) {
        let _ = self.sink.send(Message::Close(None)).await;
        let _ = self.sink.close().await;
    }
}

/// Read half of a split transport
pub struct TransportReader {
    stream: SplitStream<WsStream>,
}

impl TransportReader {
    /// Receive the next text frame, skipping control frames.
    pub async fn receive(&mut self) -> Result<String, TransportError> {
        next_text(&mut self.stream).await
    }
}

/// Pull the next text frame off a websocket stream.
///
/// Pings are answered by the websocket layer; binary frames are a protocol
/// violation for this text-encoded gateway.
async fn next_text<S>(stream: &mut S) -> Result<String, TransportError>
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => return Ok(text),
            Some(Ok(Message::Binary(_))) => {
                return Err(TransportError::Protocol("binary frame on text gateway".into()))
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
            Some(Ok(Message::Close(frame))) => {
                let (code, reason) = match frame {
                    Some(f) => (Some(u16::from(f.code)), f.reason.to_string()),
                    None => (None, String::new()),
                };
                return Err(TransportError::Closed { code, reason });
            }
            Some(Err(e)) => return Err(e.into()),
            None => {
                return Err(TransportError::Closed {
                    code: None,
                    reason: "stream ended".into(),
                })
            }
        }
    }
}
