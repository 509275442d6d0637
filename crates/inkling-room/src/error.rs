//! Error types for the room layer.

use inkling_protocol::{ErrorCode, PlayerId, RoomCode};

/// Errors that can occur during room operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// No room with this code exists.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// Rejoin named a player the room has never seen.
    #[error("no player named {0:?} in this room")]
    PlayerNotFound(String),

    /// The player is not (or no longer) a member of the room.
    #[error("player {0} is not in this room")]
    NotInRoom(PlayerId),

    /// The room is at its configured player limit.
    #[error("room {0} is full")]
    RoomFull(RoomCode),

    /// The sender lacks the role the action needs.
    #[error("only the {0} may do that")]
    NotAuthorized(&'static str),

    /// The action does not fit the room's current status.
    #[error("invalid room state for this operation: {0}")]
    InvalidState(String),

    /// Malformed or unacceptable input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Another player already uses this display name.
    #[error("name {0:?} is already taken")]
    NameTaken(String),

    /// The room's command channel is full or closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),
}

impl RoomError {
    /// The wire error code for this failure.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::RoomNotFound,
            Self::PlayerNotFound(_) | Self::NotInRoom(_) => ErrorCode::PlayerNotFound,
            Self::RoomFull(_) => ErrorCode::RoomFull,
            Self::NotAuthorized(_) => ErrorCode::NotAuthorized,
            Self::InvalidState(_) => ErrorCode::InvalidState,
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
            Self::NameTaken(_) => ErrorCode::NameTaken,
            Self::Unavailable(_) => ErrorCode::Unavailable,
        }
    }

    /// Authorization and state-mismatch failures usually mean the client's
    /// view is stale. They are acknowledged as ignored, not reported.
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::NotAuthorized(_) | Self::InvalidState(_))
    }
}
