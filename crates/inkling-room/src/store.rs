//! The room registry.
//!
//! [`RoomStore`] is injected into the server rather than living in a
//! global, so every test gets an isolated registry.

use std::collections::HashMap;

use inkling_protocol::{JoinedRoom, RoomCode, Settings};
use inkling_transport::ConnectionId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::actor::spawn_room;
use crate::{EngineConfig, PlayerSender, Room, RoomHandle};

/// Process-wide table of active rooms, keyed by room code.
///
/// Methods take `&mut self` so implementations can drop rooms whose actors
/// have stopped as they go. The server keeps the store behind one mutex.
pub trait RoomStore: Send + 'static {
    /// Looks up a live room.
    fn get(&mut self, code: &RoomCode) -> Option<RoomHandle>;

    /// Creates a room under a fresh code and seats its host, whose events
    /// go to `sender`.
    fn create(
        &mut self,
        host_name: Option<&str>,
        settings: Settings,
        connection: ConnectionId,
        sender: PlayerSender,
    ) -> (RoomHandle, JoinedRoom);

    /// Closes and forgets a room. Returns `false` if it was unknown.
    fn delete(&mut self, code: &RoomCode) -> bool;

    /// Codes of every live room, sorted.
    fn list_active(&mut self) -> Vec<RoomCode>;
}

/// The default, in-memory [`RoomStore`].
pub struct InMemoryRoomStore {
    rooms: HashMap<RoomCode, RoomHandle>,
    config: EngineConfig,
    /// Draws room codes and seeds each room's own RNG.
    rng: StdRng,
}

impl InMemoryRoomStore {
    /// Creates an empty store with a randomly seeded RNG.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_seed(config, rand::rng().random())
    }

    /// Creates an empty store whose codes and room RNGs derive from `seed`.
    pub fn with_seed(config: EngineConfig, seed: u64) -> Self {
        Self {
            rooms: HashMap::new(),
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// The engine configuration handed to new rooms.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of rooms whose actors are still running.
    pub fn len(&self) -> usize {
        self.rooms.values().filter(|h| !h.is_closed()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn prune(&mut self) {
        self.rooms.retain(|code, handle| {
            let alive = !handle.is_closed();
            if !alive {
                tracing::debug!(room = %code, "closed room pruned");
            }
            alive
        });
    }

    fn fresh_code(&mut self) -> RoomCode {
        loop {
            let code = RoomCode::generate(&mut self.rng);
            if !self.rooms.contains_key(&code) {
                return code;
            }
        }
    }
}

impl RoomStore for InMemoryRoomStore {
    fn get(&mut self, code: &RoomCode) -> Option<RoomHandle> {
        self.prune();
        self.rooms.get(code).cloned()
    }

    fn create(
        &mut self,
        host_name: Option<&str>,
        settings: Settings,
        connection: ConnectionId,
        sender: PlayerSender,
    ) -> (RoomHandle, JoinedRoom) {
        self.prune();
        let code = self.fresh_code();
        let room_rng = StdRng::seed_from_u64(self.rng.random());
        let room = Room::create(code.clone(), host_name, settings, self.config.clone(), room_rng);
        let joined = JoinedRoom {
            room_id: code.clone(),
            player_id: room.host(),
            state: room.snapshot(),
        };

        let handle = spawn_room(room, connection, sender, self.config.channel_size);
        self.rooms.insert(code, handle.clone());
        (handle, joined)
    }

    fn delete(&mut self, code: &RoomCode) -> bool {
        match self.rooms.remove(code) {
            Some(handle) => {
                if !handle.try_shutdown() {
                    tracing::debug!(room = %code, "room already stopping");
                }
                tracing::info!(room = %code, "room deleted");
                true
            }
            None => false,
        }
    }

    fn list_active(&mut self) -> Vec<RoomCode> {
        self.prune();
        let mut codes: Vec<RoomCode> = self.rooms.keys().cloned().collect();
        codes.sort();
        codes
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use inkling_protocol::{RoomStatus, ServerEvent};
    use tokio::sync::mpsc;

    use super::*;

    fn store() -> InMemoryRoomStore {
        InMemoryRoomStore::with_seed(EngineConfig::default(), 42)
    }

    #[tokio::test]
    async fn test_create_seats_host_and_registers_room() {
        let mut store = store();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let (handle, joined) = store.create(Some("Ada"), Settings::default(), ConnectionId::new(1), tx);

        assert_eq!(joined.state.host_id, joined.player_id);
        assert_eq!(joined.state.status, RoomStatus::Lobby);
        assert_eq!(store.list_active(), vec![handle.code().clone()]);
        assert!(matches!(rx.recv().await, Some(ServerEvent::RoomState(_))));
    }

    #[tokio::test]
    async fn test_get_unknown_code_returns_none() {
        let mut store = store();
        let code = RoomCode::parse("abcdef").unwrap();
        assert!(store.get(&code).is_none());
    }

    #[tokio::test]
    async fn test_delete_closes_room_and_notifies_host() {
        let mut store = store();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (handle, _) = store.create(None, Settings::default(), ConnectionId::new(1), tx);
        let code = handle.code().clone();

        assert!(store.delete(&code));
        assert!(!store.delete(&code));
        assert!(store.get(&code).is_none());

        let mut saw_closed = false;
        while let Ok(Some(event)) = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await {
            if event == ServerEvent::RoomClosed {
                saw_closed = true;
                break;
            }
        }
        assert!(saw_closed);
    }

    #[tokio::test]
    async fn test_list_active_skips_stopped_rooms() {
        let mut store = store();
        let (tx, _rx) = mpsc::unbounded_channel();
        let (handle, joined) = store.create(None, Settings::default(), ConnectionId::new(1), tx);

        handle
            .act(joined.player_id, crate::PlayerAction::Close)
            .await
            .unwrap();
        // Wait for the actor to stop.
        tokio::time::timeout(Duration::from_secs(1), async {
            while !handle.is_closed() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        assert!(store.list_active().is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_with_seed_codes_are_deterministic() {
        let mut a = store();
        let mut b = store();
        assert_eq!(a.fresh_code(), b.fresh_code());
    }
}
