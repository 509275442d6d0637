//! Cancellable timers for Inkling rooms.
//!
//! Rooms never spawn sleeping tasks. Every delay (turn expiry, letter
//! reveal, auto-progress countdown, reconnection grace) is a value owned by
//! the entity it belongs to:
//!
//! - [`Timer`]: a one-shot deadline that is either armed or disarmed.
//! - [`Countdown`]: a per-second ticker that finishes after N ticks. The
//!   tick broadcast and the final firing live in one value, so cancelling
//!   one always cancels the other.
//!
//! Dropping the owner drops its timers. A disarmed timer never fires.
//!
//! # Integration
//!
//! The room actor asks its aggregate for the earliest armed deadline and
//! races it against the command channel:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         _ = inkling_timer::sleep_until(room.next_deadline()) => {
//!             room.fire_due(Instant::now());
//!         }
//!     }
//! }
//! ```
//!
//! All instants are [`tokio::time::Instant`] so tests can drive them with
//! `tokio::time::pause()`.

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::trace;

// ---------------------------------------------------------------------------
// Free helpers
// ---------------------------------------------------------------------------

/// Sleeps until `deadline`, or pends forever when there is none.
///
/// `tokio::select!` keeps polling its other branches while this pends, so
/// an idle room simply waits on its command channel.
pub async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

/// Returns the earliest of the given optional deadlines.
pub fn earliest<I>(deadlines: I) -> Option<Instant>
where
    I: IntoIterator<Item = Option<Instant>>,
{
    deadlines.into_iter().flatten().min()
}

// ---------------------------------------------------------------------------
// Timer
// ---------------------------------------------------------------------------

/// A one-shot, cancellable deadline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timer {
    deadline: Option<Instant>,
}

impl Timer {
    /// A timer that is not armed.
    pub const fn disarmed() -> Self {
        Self { deadline: None }
    }

    /// A timer armed to fire `delay` from now.
    pub fn after(delay: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + delay),
        }
    }

    /// Arms (or re-arms) the timer to fire `delay` from now.
    pub fn arm(&mut self, delay: Duration) {
        self.arm_at(Instant::now() + delay);
    }

    /// Arms (or re-arms) the timer at an absolute instant.
    pub fn arm_at(&mut self, deadline: Instant) {
        self.deadline = Some(deadline);
    }

    /// Disarms the timer. Returns `true` if it was armed.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Whether the timer is armed.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// The instant the timer will fire, if armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the timer is armed and its deadline has passed.
    pub fn is_due(&self, now: Instant) -> bool {
        matches!(self.deadline, Some(deadline) if deadline <= now)
    }

    /// Time left before the deadline, or `None` when disarmed.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }

    /// Consumes the timer if it is due. Returns `true` exactly once per arming.
    pub fn take_due(&mut self, now: Instant) -> bool {
        if self.is_due(now) {
            self.deadline = None;
            true
        } else {
            false
        }
    }

    /// Consumes the timer regardless of its deadline.
    ///
    /// Returns `false` for a disarmed timer, which is how stale firings
    /// become no-ops.
    pub fn fire(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Waits for the deadline and disarms the timer.
    ///
    /// Pends forever while disarmed.
    pub async fn wait(&mut self) {
        sleep_until(self.deadline).await;
        self.deadline = None;
    }
}

// ---------------------------------------------------------------------------
// Countdown
// ---------------------------------------------------------------------------

/// One step of a [`Countdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownTick {
    /// Whole seconds left after this tick.
    pub remaining: u32,
    /// `true` on the last tick. The countdown is idle afterwards.
    pub finished: bool,
}

/// A countdown that ticks once per second until it reaches zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Countdown {
    remaining: u32,
    next_tick: Timer,
}

impl Countdown {
    /// Spacing between ticks.
    pub const TICK: Duration = Duration::from_secs(1);

    /// A countdown that is not running.
    pub const fn idle() -> Self {
        Self {
            remaining: 0,
            next_tick: Timer::disarmed(),
        }
    }

    /// Starts (or restarts) the countdown from `seconds`.
    ///
    /// The first tick fires one second from now. A zero-second countdown
    /// fires its finishing tick immediately on the next poll.
    pub fn start(&mut self, seconds: u32) {
        self.start_at(seconds, Instant::now());
    }

    /// Same as [`start`](Self::start) with an explicit "now".
    pub fn start_at(&mut self, seconds: u32, now: Instant) {
        self.remaining = seconds;
        let first = if seconds == 0 { now } else { now + Self::TICK };
        self.next_tick.arm_at(first);
        trace!(seconds, "countdown started");
    }

    /// Stops the countdown. Returns `true` if it was running.
    pub fn cancel(&mut self) -> bool {
        self.remaining = 0;
        self.next_tick.cancel()
    }

    /// Whether the countdown is running.
    pub fn is_running(&self) -> bool {
        self.next_tick.is_armed()
    }

    /// Seconds left while running.
    pub fn remaining(&self) -> Option<u32> {
        self.is_running().then_some(self.remaining)
    }

    /// Instant of the next tick, if running.
    pub fn deadline(&self) -> Option<Instant> {
        self.next_tick.deadline()
    }

    /// Advances one tick if the next tick is due.
    pub fn poll(&mut self, now: Instant) -> Option<CountdownTick> {
        if self.next_tick.is_due(now) {
            self.fire()
        } else {
            None
        }
    }

    /// Advances one tick regardless of the deadline. `None` while idle.
    pub fn fire(&mut self) -> Option<CountdownTick> {
        let scheduled = self.next_tick.deadline()?;
        self.remaining = self.remaining.saturating_sub(1);
        let finished = self.remaining == 0;
        if finished {
            self.next_tick.cancel();
        } else {
            // Keep the original cadence even if this tick ran late.
            self.next_tick.arm_at(scheduled + Self::TICK);
        }
        trace!(remaining = self.remaining, finished, "countdown tick");
        Some(CountdownTick {
            remaining: self.remaining,
            finished,
        })
    }

    /// Waits for the next tick. Pends forever while idle.
    pub async fn wait_for_tick(&mut self) -> CountdownTick {
        loop {
            sleep_until(self.next_tick.deadline()).await;
            if let Some(tick) = self.fire() {
                return tick;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disarmed_timer_is_never_due() {
        let timer = Timer::disarmed();
        assert!(!timer.is_armed());
        assert!(!timer.is_due(Instant::now() + Duration::from_secs(3600)));
        assert_eq!(timer.deadline(), None);
    }

    #[test]
    fn test_take_due_consumes_once() {
        let now = Instant::now();
        let mut timer = Timer::disarmed();
        timer.arm_at(now);

        assert!(timer.take_due(now));
        assert!(!timer.take_due(now));
        assert!(!timer.is_armed());
    }

    #[test]
    fn test_take_due_before_deadline_keeps_timer() {
        let now = Instant::now();
        let mut timer = Timer::disarmed();
        timer.arm_at(now + Duration::from_secs(5));

        assert!(!timer.take_due(now));
        assert!(timer.is_armed());
        assert_eq!(timer.remaining(now), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_fire_on_disarmed_timer_is_noop() {
        let mut timer = Timer::disarmed();
        assert!(!timer.fire());
    }

    #[test]
    fn test_cancel_reports_previous_state() {
        let mut timer = Timer::after(Duration::from_secs(1));
        assert!(timer.cancel());
        assert!(!timer.cancel());
    }

    #[test]
    fn test_earliest_skips_disarmed() {
        let now = Instant::now();
        let later = now + Duration::from_secs(2);
        assert_eq!(earliest([None, Some(later), Some(now), None]), Some(now));
        assert_eq!(earliest([None, None]), None);
    }

    #[test]
    fn test_countdown_ticks_down_to_finish() {
        let now = Instant::now();
        let mut countdown = Countdown::idle();
        countdown.start_at(3, now);
        assert_eq!(countdown.remaining(), Some(3));

        let ticks: Vec<_> = std::iter::from_fn(|| countdown.fire()).collect();

        assert_eq!(
            ticks,
            vec![
                CountdownTick { remaining: 2, finished: false },
                CountdownTick { remaining: 1, finished: false },
                CountdownTick { remaining: 0, finished: true },
            ]
        );
        assert!(!countdown.is_running());
        assert_eq!(countdown.remaining(), None);
    }

    #[test]
    fn test_countdown_cancel_stops_ticks_and_finish_together() {
        let now = Instant::now();
        let mut countdown = Countdown::idle();
        countdown.start_at(10, now);

        assert!(countdown.cancel());
        assert_eq!(countdown.fire(), None);
        assert_eq!(countdown.poll(now + Duration::from_secs(60)), None);
    }

    #[test]
    fn test_countdown_zero_finishes_on_first_poll() {
        let now = Instant::now();
        let mut countdown = Countdown::idle();
        countdown.start_at(0, now);

        assert_eq!(
            countdown.poll(now),
            Some(CountdownTick { remaining: 0, finished: true })
        );
    }

    #[test]
    fn test_countdown_keeps_cadence_when_late() {
        let now = Instant::now();
        let mut countdown = Countdown::idle();
        countdown.start_at(5, now);

        // Poll 1.5s late: the tick fires, and the next one stays on the
        // original one-second grid.
        let late = now + Duration::from_millis(1500);
        assert!(countdown.poll(late).is_some());
        assert_eq!(countdown.deadline(), Some(now + Duration::from_secs(2)));
    }
}
