//! Unified error type for the Inkling server.

use inkling_protocol::{AckOutcome, ErrorCode, ProtocolError};
use inkling_room::RoomError;
use inkling_session::SessionError;
use inkling_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum InklingError {
    /// A transport-level error (bind, accept, send).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (connection already or not yet seated).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (full, not found, refused action).
    #[error(transparent)]
    Room(#[from] RoomError),
}

impl InklingError {
    /// How a failed client request is acknowledged.
    ///
    /// Role and status mismatches, and room-scoped events from a connection
    /// that sits in no room, are stale-client noise and come back as
    /// [`AckOutcome::Ignored`].
    pub fn outcome(&self) -> AckOutcome {
        let code = match self {
            Self::Room(e) if e.is_silent() => return AckOutcome::Ignored,
            Self::Session(SessionError::NotBound(_)) => return AckOutcome::Ignored,
            Self::Room(e) => e.code(),
            Self::Session(SessionError::AlreadyBound(_)) => ErrorCode::InvalidState,
            Self::Protocol(_) => ErrorCode::InvalidInput,
            Self::Transport(_) => ErrorCode::Unavailable,
        };
        AckOutcome::Error {
            code,
            message: self.to_string(),
        }
    }
}
