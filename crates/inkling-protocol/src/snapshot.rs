//! Read-only views of a room, as pushed to every client.
//!
//! A snapshot is always the full picture, never a diff. The room builds one
//! after every state-changing action and broadcasts it as `room:state`.

use serde::{Deserialize, Serialize};

use crate::{PlayerId, RoomCode, RoomStatus, Settings};

/// The full client-visible state of a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub id: RoomCode,
    pub host_id: PlayerId,
    pub settings: Settings,
    pub status: RoomStatus,
    pub players: Vec<PlayerView>,
    /// The active drawer's turn, if any.
    pub current_round: Option<TurnView>,
    pub game_state: GameView,
}

impl RoomSnapshot {
    /// Looks up a player by id.
    pub fn player(&self, id: PlayerId) -> Option<&PlayerView> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Looks up a player by display name.
    pub fn player_named(&self, name: &str) -> Option<&PlayerView> {
        self.players.iter().find(|p| p.name == name)
    }
}

/// One player as other clients see them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    /// May be negative.
    pub score: i64,
    /// Total negative overflow ever accumulated. Never decreases.
    pub debt: u64,
    pub is_host: bool,
    pub is_drawer: bool,
    /// `false` while the player is inside their reconnection grace period.
    pub connected: bool,
    pub has_drawn_this_round: bool,
}

/// The active turn. The secret word is never included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnView {
    /// Round ordinal the turn belongs to.
    pub number: u32,
    pub drawer_id: PlayerId,
    /// Unix epoch milliseconds at which the turn expires.
    pub ends_at: u64,
    /// `None` until the drawer picks a word.
    pub mask: Option<Vec<char>>,
    /// Players who guessed correctly, in guess order.
    pub guessed: Vec<PlayerId>,
}

/// Round-cycle progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub current_round_number: u32,
    pub total_rounds: u32,
    pub all_drawers_completed: bool,
    /// Seconds left on the auto-progress countdown, while it runs.
    pub auto_progress_countdown: Option<u32>,
}

/// One line of a leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ranking {
    /// 1-based.
    pub rank: usize,
    pub id: PlayerId,
    pub name: String,
    pub score: i64,
    pub debt: u64,
}
