//! Session types: what the server remembers about one connection.

use inkling_protocol::{PlayerId, RoomCode};
use inkling_transport::{CloseKind, ConnectionId};

/// One connection's binding to a player seat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// The transport connection currently carrying this player.
    pub connection: ConnectionId,
    /// The stable player identity inside the room.
    pub player_id: PlayerId,
    /// The room the player sits in.
    pub room: RoomCode,
}

/// Why a player's connection went away.
///
/// ```text
///   Deliberate ──→ removed now
///   Transient  ──→ seat kept, grace timer armed ──(rejoin)──→ seat reclaimed
///                                              └─(expiry)─→ removed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The client closed on purpose.
    Deliberate,
    /// Network loss, page refresh, idle timeout. The seat is held.
    Transient,
}

impl From<CloseKind> for DisconnectReason {
    fn from(kind: CloseKind) -> Self {
        match kind {
            CloseKind::Deliberate => Self::Deliberate,
            CloseKind::Transient => Self::Transient,
        }
    }
}
