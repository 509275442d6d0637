//! Error types for the session layer.

use inkling_transport::ConnectionId;

/// Errors that can occur while binding connections to players.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The connection is already playing in a room and must leave first.
    #[error("connection {0} is already bound to a room")]
    AlreadyBound(ConnectionId),

    /// The connection is not bound to any room.
    #[error("connection {0} is not in a room")]
    NotBound(ConnectionId),
}
