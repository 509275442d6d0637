//! Engine-wide timing configuration.

use std::time::Duration;

/// Timing and sizing knobs shared by every room in the process.
///
/// Per-room gameplay settings (points, time limit, rounds) live in
/// [`Settings`](inkling_protocol::Settings) and travel over the wire; these
/// do not.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Delay between letter reveals for ordinary words.
    pub reveal_interval: Duration,

    /// Delay between letter reveals for words with at most
    /// [`SHORT_WORD_LEN`](crate::mask::SHORT_WORD_LEN) significant characters.
    pub short_word_reveal_interval: Duration,

    /// Seconds of countdown between two turns.
    pub turn_countdown_secs: u32,

    /// Seconds of countdown on the round results screen.
    pub results_countdown_secs: u32,

    /// How long final rankings stay up before the room returns to the lobby.
    pub reset_delay: Duration,

    /// How long a dropped player's seat is held.
    pub reconnect_grace: Duration,

    /// Capacity of each room actor's command queue.
    pub channel_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reveal_interval: Duration::from_secs(20),
            short_word_reveal_interval: Duration::from_secs(40),
            turn_countdown_secs: 3,
            results_countdown_secs: 10,
            reset_delay: Duration::from_secs(30),
            reconnect_grace: Duration::from_secs(30),
            channel_size: 64,
        }
    }
}

impl EngineConfig {
    /// Returns a copy with a different reconnection grace period.
    pub fn with_reconnect_grace(mut self, grace: Duration) -> Self {
        self.reconnect_grace = grace;
        self
    }
}
