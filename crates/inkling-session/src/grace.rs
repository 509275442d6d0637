//! Reconnection grace periods.

use std::collections::BTreeMap;
use std::time::Duration;

use inkling_protocol::PlayerId;
use inkling_timer::Timer;
use tokio::time::Instant;

/// Pending-disconnect registry for one room.
///
/// Each disconnected player owns one [`Timer`]. Exactly one of three
/// things ends it:
///
/// - the player rejoins ([`cancel`](Self::cancel)): the seat is kept;
/// - the player leaves or is kicked ([`cancel`](Self::cancel)): removal
///   already happened, so the timer must not remove them a second time;
/// - the timer fires ([`take_due`](Self::take_due)): the caller removes
///   the player.
#[derive(Debug, Clone)]
pub struct GracePeriods {
    grace: Duration,
    pending: BTreeMap<PlayerId, Timer>,
}

impl GracePeriods {
    /// Creates an empty registry with the given grace duration.
    pub fn new(grace: Duration) -> Self {
        Self {
            grace,
            pending: BTreeMap::new(),
        }
    }

    /// The configured grace duration.
    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Starts (or restarts) the grace period for `player`.
    pub fn start(&mut self, player: PlayerId) {
        self.start_at(player, Instant::now());
    }

    /// Same as [`start`](Self::start) with an explicit "now".
    pub fn start_at(&mut self, player: PlayerId, now: Instant) {
        let mut timer = Timer::disarmed();
        timer.arm_at(now + self.grace);
        self.pending.insert(player, timer);
        tracing::debug!(%player, grace_secs = self.grace.as_secs(), "grace period started");
    }

    /// Cancels a pending grace period. Returns `true` if one was pending.
    pub fn cancel(&mut self, player: PlayerId) -> bool {
        self.pending.remove(&player).is_some()
    }

    /// Whether `player` is inside a grace period.
    pub fn is_pending(&self, player: PlayerId) -> bool {
        self.pending.contains_key(&player)
    }

    /// The earliest expiry across all pending players.
    pub fn next_deadline(&self) -> Option<Instant> {
        inkling_timer::earliest(self.pending.values().map(Timer::deadline))
    }

    /// The lowest-id player whose grace period has elapsed, without
    /// removing them.
    pub fn first_due(&self, now: Instant) -> Option<PlayerId> {
        self.pending
            .iter()
            .find(|(_, timer)| timer.is_due(now))
            .map(|(player, _)| *player)
    }

    /// Removes and returns every player whose grace period has elapsed,
    /// in player-id order.
    pub fn take_due(&mut self, now: Instant) -> Vec<PlayerId> {
        let due: Vec<PlayerId> = self
            .pending
            .iter()
            .filter(|(_, timer)| timer.is_due(now))
            .map(|(player, _)| *player)
            .collect();
        for player in &due {
            self.pending.remove(player);
        }
        due
    }

    /// Expires `player` immediately, regardless of the deadline.
    ///
    /// Returns `false` if no grace period was pending, which makes a late
    /// or duplicate expiry a no-op.
    pub fn expire(&mut self, player: PlayerId) -> bool {
        self.cancel(player)
    }

    /// Drops every pending grace period.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Number of players inside a grace period.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if nobody is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
