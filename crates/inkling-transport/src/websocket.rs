//! WebSocket transport implementation using `tokio-tungstenite`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;

use crate::{CloseKind, Connection, ConnectionId, Incoming, Transport, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

/// A WebSocket-based [`Transport`] that listens for incoming connections.
pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self { listener })
    }

    /// Returns the address the listener is bound to.
    ///
    /// Useful after binding to port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::Accept)?;

        let ws = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(|e| TransportError::Handshake(format!("{addr}: {e}")))?;

        let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%id, %addr, "accepted WebSocket connection");

        // Each half gets its own lock so a pending read never blocks a write.
        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }
}

/// A single WebSocket connection.
pub struct WebSocketConnection {
    id: ConnectionId,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

/// Classifies a close frame.
///
/// A normal close (1000) or a close with no status is what a client sends
/// when the user leaves on purpose. Everything else, including "going
/// away" (1001) from a page refresh, keeps the seat for reconnection.
fn close_kind(frame: Option<&CloseFrame>) -> CloseKind {
    match frame {
        None => CloseKind::Deliberate,
        Some(frame) if frame.code == CloseCode::Normal => CloseKind::Deliberate,
        Some(_) => CloseKind::Transient,
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        // Inkling speaks JSON, so frames go out as text when they can.
        let msg = match std::str::from_utf8(data) {
            Ok(text) => Message::Text(text.to_owned().into()),
            Err(_) => Message::Binary(data.to_vec().into()),
        };
        self.sink.lock().await.send(msg).await.map_err(|e| TransportError::Send {
            connection: self.id,
            reason: e.to_string(),
        })
    }

    async fn recv(&self) -> Incoming {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Incoming::Data(text.as_bytes().to_vec());
                }
                Some(Ok(Message::Binary(data))) => {
                    return Incoming::Data(data.to_vec());
                }
                Some(Ok(Message::Close(frame))) => {
                    let kind = close_kind(frame.as_ref());
                    tracing::debug!(id = %self.id, ?kind, "peer closed connection");
                    return Incoming::Closed(kind);
                }
                Some(Ok(_)) => continue, // ping/pong/raw frame
                Some(Err(e)) => {
                    tracing::debug!(id = %self.id, error = %e, "recv failed");
                    return Incoming::Closed(CloseKind::Transient);
                }
                None => return Incoming::Closed(CloseKind::Transient),
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.sink.lock().await.close().await.map_err(|e| TransportError::Send {
            connection: self.id,
            reason: e.to_string(),
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_kind_without_frame_is_deliberate() {
        assert_eq!(close_kind(None), CloseKind::Deliberate);
    }

    #[test]
    fn test_close_kind_normal_is_deliberate() {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "bye".into(),
        };
        assert_eq!(close_kind(Some(&frame)), CloseKind::Deliberate);
    }

    #[test]
    fn test_close_kind_going_away_is_transient() {
        let frame = CloseFrame {
            code: CloseCode::Away,
            reason: "".into(),
        };
        assert_eq!(close_kind(Some(&frame)), CloseKind::Transient);
    }
}
