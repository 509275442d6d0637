//! One drawer's turn.

use std::time::Duration;

use inkling_protocol::{PlayerId, TurnView};
use inkling_timer::Timer;
use serde_json::Value;

use crate::mask::Mask;
use crate::room::now_millis;

/// Wall-clock deadline `limit` after `now`, saturating instead of wrapping.
fn deadline_millis(now: u64, limit: Duration) -> u64 {
    now.saturating_add(u64::try_from(limit.as_millis()).unwrap_or(u64::MAX))
}

/// A correct guess, in the order guesses arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrectGuess {
    pub player_id: PlayerId,
    /// Unix epoch milliseconds.
    pub at: u64,
}

/// The active turn.
///
/// Owns its expiry and reveal timers: dropping the turn disarms both.
#[derive(Debug, Clone)]
pub struct Turn {
    number: u32,
    drawer: PlayerId,
    options: Vec<String>,
    pub(crate) word: Option<String>,
    pub(crate) mask: Option<Mask>,
    pub(crate) guesses: Vec<CorrectGuess>,
    ends_at: u64,
    pub(crate) expiry: Timer,
    pub(crate) reveal: Timer,
    pub(crate) strokes: Vec<Value>,
}

impl Turn {
    pub(crate) fn new(number: u32, drawer: PlayerId, options: Vec<String>, limit: Duration) -> Self {
        Self {
            number,
            drawer,
            options,
            word: None,
            mask: None,
            guesses: Vec::new(),
            ends_at: deadline_millis(now_millis(), limit),
            expiry: Timer::after(limit),
            reveal: Timer::disarmed(),
            strokes: Vec::new(),
        }
    }

    /// Round ordinal this turn belongs to.
    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn drawer(&self) -> PlayerId {
        self.drawer
    }

    /// Words offered to the drawer.
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// The secret word, once chosen.
    pub fn word(&self) -> Option<&str> {
        self.word.as_deref()
    }

    pub fn mask(&self) -> Option<&Mask> {
        self.mask.as_ref()
    }

    pub fn guesses(&self) -> &[CorrectGuess] {
        &self.guesses
    }

    /// Whether `player` already guessed this turn.
    pub fn has_guessed(&self, player: PlayerId) -> bool {
        self.guesses.iter().any(|g| g.player_id == player)
    }

    /// Strokes accepted so far this turn.
    pub fn strokes(&self) -> &[Value] {
        &self.strokes
    }

    /// Unix epoch milliseconds at which the turn expires.
    pub fn ends_at(&self) -> u64 {
        self.ends_at
    }

    pub(crate) fn view(&self) -> TurnView {
        TurnView {
            number: self.number,
            drawer_id: self.drawer,
            ends_at: self.ends_at,
            mask: self.mask.as_ref().map(Mask::render),
            guessed: self.guesses.iter().map(|g| g.player_id).collect(),
        }
    }
}
