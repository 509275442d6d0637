use crate::ConnectionId;

/// Errors that can occur in the transport layer.
///
/// Receiving never fails: a broken read surfaces as
/// [`Incoming::Closed`](crate::Incoming::Closed) instead.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The listening socket could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Accepting a TCP connection failed.
    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),

    /// The peer connected but the WebSocket upgrade did not complete.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// A frame could not be written; the peer is most likely gone.
    #[error("send failed on {connection}: {reason}")]
    Send {
        connection: ConnectionId,
        reason: String,
    },
}
