//! Core protocol types: identities, room codes, room status and the
//! envelope every message travels in.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A stable identifier for a player inside a room.
///
/// Unlike the transport's connection id, a `PlayerId` survives reconnects:
/// rejoining swaps the connection bound to it, never the id itself. Score,
/// host and drawer roles all hang off this id.
///
/// `#[serde(transparent)]` puts it on the wire as a plain number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A short, human-typeable room code such as `"KQXBTR"`.
///
/// Codes are six characters from [`RoomCode::ALPHABET`], which leaves out
/// `I` and `O` so nobody confuses them with `1` and `0`. Lookups are
/// case-insensitive: [`RoomCode::parse`] normalizes to upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Characters a room code may contain.
    pub const ALPHABET: &'static str = "ABCDEFGHJKLMNPQRSTUVWXYZ";

    /// Length of every room code.
    pub const LEN: usize = 6;

    /// Generates a random code.
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        let alphabet = Self::ALPHABET.as_bytes();
        let code = (0..Self::LEN)
            .map(|_| char::from(alphabet[rng.random_range(0..alphabet.len())]))
            .collect();
        Self(code)
    }

    /// Parses user input into a code: trims, upper-cases, then validates
    /// length and alphabet.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] if the input cannot be a
    /// room code.
    pub fn parse(input: &str) -> Result<Self, ProtocolError> {
        let code = input.trim().to_ascii_uppercase();
        let valid = code.len() == Self::LEN && code.chars().all(|c| Self::ALPHABET.contains(c));
        if valid {
            Ok(Self(code))
        } else {
            Err(ProtocolError::InvalidMessage(format!("invalid room code {input:?}")))
        }
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who should receive a server event.
///
/// Room logic emits `(Recipient, ServerEvent)` pairs; the room actor turns
/// them into per-connection sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Every player in the room.
    All,
    /// One specific player.
    Player(PlayerId),
    /// Everyone except the given player (e.g. stroke relay skips the drawer).
    AllExcept(PlayerId),
}

impl Recipient {
    /// Whether a player with the given id is addressed.
    pub fn includes(self, player: PlayerId) -> bool {
        match self {
            Self::All => true,
            Self::Player(target) => target == player,
            Self::AllExcept(excluded) => excluded != player,
        }
    }
}

// ---------------------------------------------------------------------------
// RoomStatus
// ---------------------------------------------------------------------------

/// The lifecycle state of a room.
///
/// ```text
/// Lobby → InRound → RoundResults → (InRound | GameComplete) → Lobby
/// ```
///
/// `InRound` also goes straight to `GameComplete` when too few players
/// remain to continue. Moving between turns keeps the room in `InRound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    /// Accepting joins; host may start once at least two players are in.
    Lobby,
    /// A drawer is assigned. The word may not be chosen yet.
    InRound,
    /// Every player has drawn this round; the results countdown runs.
    RoundResults,
    /// Final rankings shown; the room resets to `Lobby` after a delay.
    GameComplete,
}

impl RoomStatus {
    /// Returns `true` if moving to `target` is a legal transition.
    pub fn can_transition_to(self, target: Self) -> bool {
        use RoomStatus::*;
        matches!(
            (self, target),
            (Lobby, InRound)
                | (InRound, RoundResults)
                | (InRound, GameComplete)
                | (RoundResults, InRound)
                | (RoundResults, GameComplete)
                | (GameComplete, Lobby)
        )
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lobby => "LOBBY",
            Self::InRound => "IN_ROUND",
            Self::RoundResults => "ROUND_RESULTS",
            Self::GameComplete => "GAME_COMPLETE",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// TurnEndReason / ErrorCode
// ---------------------------------------------------------------------------

/// Why a drawer's turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnEndReason {
    /// Every non-drawer guessed the word.
    AllGuessed,
    /// The turn's time limit elapsed.
    TimeUp,
    /// The host ended the turn manually.
    Host,
    /// The drawer left or was removed mid-turn.
    DrawerLeft,
}

impl fmt::Display for TurnEndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AllGuessed => "ALL_GUESSED",
            Self::TimeUp => "TIME_UP",
            Self::Host => "HOST",
            Self::DrawerLeft => "DRAWER_LEFT",
        };
        f.write_str(name)
    }
}

/// Machine-readable error codes carried in an error acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Unknown room code.
    RoomNotFound,
    /// Rejoin named a player the room does not know.
    PlayerNotFound,
    /// The room is at its configured player limit.
    RoomFull,
    /// The sender lacks the role the action needs.
    NotAuthorized,
    /// The action is not valid in the room's current status.
    InvalidState,
    /// Malformed or unacceptable input.
    InvalidInput,
    /// Another player in the room already uses that display name.
    NameTaken,
    /// The room is shutting down or its queue is full.
    Unavailable,
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The top-level wrapper for every message on the wire.
///
/// ```text
/// { "seq": 42, "timestamp": 15000, "payload": { "event": "...", "data": ... } }
/// ```
///
/// Each side numbers its own envelopes. The server answers every client
/// envelope with an `ack` event that echoes the client's `seq`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Sender's sequence number.
    pub seq: u64,

    /// Milliseconds since the sender started. Optional from clients.
    #[serde(default)]
    pub timestamp: u64,

    /// The event itself.
    pub payload: T,
}
