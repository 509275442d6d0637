//! The session manager: which connection plays which seat.
//!
//! # Concurrency note
//!
//! `SessionManager` is a plain pair of `HashMap`s. The server wraps it in a
//! single mutex; nothing here awaits, so the lock is never held across I/O.

use std::collections::HashMap;

use inkling_protocol::{PlayerId, RoomCode};
use inkling_transport::ConnectionId;

use crate::{Session, SessionError};

/// Maps live connections to player seats and back.
///
/// ```text
/// bind(conn-1, P-7) ──→ [conn-1 ↔ P-7]
///        (network drop, client reconnects as conn-2)
/// bind(conn-2, P-7) ──→ [conn-2 ↔ P-7], returns Some(conn-1)
/// unbind(conn-1)    ──→ None: conn-1 no longer speaks for P-7
/// ```
#[derive(Debug, Default)]
pub struct SessionManager {
    /// Live bindings, keyed by connection.
    sessions: HashMap<ConnectionId, Session>,

    /// Reverse index: the one connection currently speaking for a player.
    /// Kept in sync with `sessions`.
    by_player: HashMap<PlayerId, ConnectionId>,
}

impl SessionManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `connection` to a player seat.
    ///
    /// If another connection was speaking for the same player (a rejoin
    /// while the old socket is still half-open), that binding is dropped
    /// and its id returned so the caller can detach it.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyBound`] if `connection` already plays
    /// in a room.
    pub fn bind(
        &mut self,
        connection: ConnectionId,
        player_id: PlayerId,
        room: RoomCode,
    ) -> Result<Option<ConnectionId>, SessionError> {
        if self.sessions.contains_key(&connection) {
            return Err(SessionError::AlreadyBound(connection));
        }

        let displaced = self.by_player.insert(player_id, connection);
        if let Some(old) = displaced {
            self.sessions.remove(&old);
            tracing::debug!(%player_id, %old, new = %connection, "connection displaced");
        }

        self.sessions.insert(
            connection,
            Session {
                connection,
                player_id,
                room,
            },
        );
        Ok(displaced)
    }

    /// Removes the binding for `connection`.
    ///
    /// Returns `None` if the connection was never bound or has already been
    /// displaced by a newer one.
    pub fn unbind(&mut self, connection: ConnectionId) -> Option<Session> {
        let session = self.sessions.remove(&connection)?;
        if self.by_player.get(&session.player_id) == Some(&connection) {
            self.by_player.remove(&session.player_id);
        }
        Some(session)
    }

    /// Looks up the binding for a connection.
    pub fn get(&self, connection: ConnectionId) -> Option<&Session> {
        self.sessions.get(&connection)
    }

    /// Like [`get`](Self::get), but an error when unbound.
    ///
    /// # Errors
    /// Returns [`SessionError::NotBound`].
    pub fn require(&self, connection: ConnectionId) -> Result<&Session, SessionError> {
        self.get(connection).ok_or(SessionError::NotBound(connection))
    }

    /// The connection currently speaking for a player.
    pub fn connection_for(&self, player_id: PlayerId) -> Option<ConnectionId> {
        self.by_player.get(&player_id).copied()
    }

    /// Number of bound connections.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Naming convention: `test_{function}_{scenario}_{expected}`.

    use super::*;

    fn conn(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn pid(id: u64) -> PlayerId {
        PlayerId(id)
    }

    fn room() -> RoomCode {
        RoomCode::parse("ABCDEF").unwrap()
    }

    // =====================================================================
    // bind()
    // =====================================================================

    #[test]
    fn test_bind_new_connection_returns_no_displaced() {
        let mut mgr = SessionManager::new();

        let displaced = mgr.bind(conn(1), pid(7), room()).unwrap();

        assert_eq!(displaced, None);
        let session = mgr.get(conn(1)).unwrap();
        assert_eq!(session.player_id, pid(7));
        assert_eq!(session.room, room());
        assert_eq!(mgr.connection_for(pid(7)), Some(conn(1)));
    }

    #[test]
    fn test_bind_same_player_new_connection_displaces_old() {
        let mut mgr = SessionManager::new();
        mgr.bind(conn(1), pid(7), room()).unwrap();

        let displaced = mgr.bind(conn(2), pid(7), room()).unwrap();

        assert_eq!(displaced, Some(conn(1)));
        assert!(mgr.get(conn(1)).is_none());
        assert_eq!(mgr.connection_for(pid(7)), Some(conn(2)));
        assert_eq!(mgr.len(), 1);
    }

    #[test]
    fn test_bind_connection_already_bound_returns_error() {
        let mut mgr = SessionManager::new();
        mgr.bind(conn(1), pid(7), room()).unwrap();

        let result = mgr.bind(conn(1), pid(8), room());

        assert!(matches!(result, Err(SessionError::AlreadyBound(c)) if c == conn(1)));
        assert_eq!(mgr.connection_for(pid(8)), None);
    }

    // =====================================================================
    // unbind()
    // =====================================================================

    #[test]
    fn test_unbind_bound_connection_returns_session() {
        let mut mgr = SessionManager::new();
        mgr.bind(conn(1), pid(7), room()).unwrap();

        let session = mgr.unbind(conn(1)).unwrap();

        assert_eq!(session.player_id, pid(7));
        assert!(mgr.is_empty());
        assert_eq!(mgr.connection_for(pid(7)), None);
    }

    #[test]
    fn test_unbind_displaced_connection_returns_none() {
        let mut mgr = SessionManager::new();
        mgr.bind(conn(1), pid(7), room()).unwrap();
        mgr.bind(conn(2), pid(7), room()).unwrap();

        assert!(mgr.unbind(conn(1)).is_none());
        assert_eq!(mgr.connection_for(pid(7)), Some(conn(2)));
    }

    #[test]
    fn test_unbind_twice_second_is_none() {
        let mut mgr = SessionManager::new();
        mgr.bind(conn(1), pid(7), room()).unwrap();

        assert!(mgr.unbind(conn(1)).is_some());
        assert!(mgr.unbind(conn(1)).is_none());
    }

    #[test]
    fn test_unbind_then_bind_again_allowed() {
        let mut mgr = SessionManager::new();
        mgr.bind(conn(1), pid(7), room()).unwrap();
        mgr.unbind(conn(1));

        assert!(mgr.bind(conn(1), pid(9), room()).is_ok());
    }

    // =====================================================================
    // require()
    // =====================================================================

    #[test]
    fn test_require_unbound_returns_not_bound() {
        let mgr = SessionManager::new();
        assert!(matches!(mgr.require(conn(3)), Err(SessionError::NotBound(_))));
    }
}
