//! Turn and round scheduling.
//!
//! ```text
//! start_game ─→ start_next_turn ─→ begin_turn(drawer) ─→ ... ─→ finish_turn
//!                     ↑                                           │
//!                     └──── countdown (3 s) ←─────────────────────┘
//!                     │ nobody left to draw
//!                     ↓
//!               complete_round ─→ countdown (10 s) ─→ advance_round | end_game
//!                                                                      │
//!                                              reset timer (30 s) ─→ reset_to_lobby
//! ```

use std::time::Duration;

use inkling_protocol::{PlayerId, Recipient, RoomStatus, ServerEvent, TurnEndReason};
use rand::Rng;

use crate::room::{Room, RoundCycle};
use crate::scoring::{self, DrawerOutcome};
use crate::turn::Turn;
use crate::words;

/// Players needed to keep a game going.
const MIN_PLAYERS: usize = 2;

impl Room {
    /// Picks uniformly among players who have not drawn this round.
    pub(crate) fn select_next_drawer(&mut self) -> Option<PlayerId> {
        let eligible: Vec<PlayerId> = self
            .players
            .keys()
            .filter(|p| !self.cycle.has_drawn.contains(*p))
            .copied()
            .collect();
        if eligible.is_empty() {
            return None;
        }
        Some(eligible[self.rng.random_range(0..eligible.len())])
    }

    /// Starts the next drawer's turn, or completes the round if everyone
    /// has drawn.
    pub(crate) fn start_next_turn(&mut self) {
        match self.select_next_drawer() {
            Some(drawer) => self.begin_turn(drawer),
            None => self.complete_round(),
        }
    }

    /// Assigns `drawer`, offers them words, and arms the turn expiry.
    pub(crate) fn begin_turn(&mut self, drawer: PlayerId) {
        self.countdown.cancel();
        self.transition(RoomStatus::InRound);

        let options = words::pick_words(
            &mut self.rng,
            self.settings.words_per_round,
            self.settings.max_word_length,
            &self.settings.custom_words,
        );
        let limit = Duration::from_secs(u64::from(self.settings.round_time_sec));
        self.turn = Some(Turn::new(self.cycle.number, drawer, options.clone(), limit));
        tracing::info!(room = %self.code, %drawer, round = self.cycle.number, "turn started");

        self.push(Recipient::All, ServerEvent::ClearCanvas);
        self.push(Recipient::Player(drawer), ServerEvent::WordOptions { words: options });
        self.broadcast_state();
    }

    /// Scores the turn, records the drawer, and starts the short countdown.
    ///
    /// Dropping the turn disarms its expiry and reveal timers.
    pub(crate) fn finish_turn(&mut self, reason: TurnEndReason) {
        let Some(turn) = self.turn.take() else {
            return;
        };

        let sequence = scoring::score_sequence(self.settings.max_points);
        for (index, guess) in turn.guesses().iter().enumerate() {
            if let Some(player) = self.players.get_mut(&guess.player_id) {
                player.score += i64::from(scoring::guesser_points(&sequence, index));
            }
        }

        let anyone_guessed = !turn.guesses().is_empty();
        let outcome = scoring::drawer_outcome(self.settings.max_points, anyone_guessed, &mut self.rng);
        if let Some(drawer) = self.players.get_mut(&turn.drawer()) {
            match outcome {
                DrawerOutcome::Reward(points) => drawer.score += i64::from(points),
                DrawerOutcome::Penalty(points) => {
                    scoring::apply_penalty(&mut drawer.score, &mut drawer.debt, points);
                }
                DrawerOutcome::Spared => {}
            }
        }

        self.cycle.has_drawn.insert(turn.drawer());
        self.cycle.all_drawn = self.players.keys().all(|p| self.cycle.has_drawn.contains(p));
        tracing::info!(
            room = %self.code,
            drawer = %turn.drawer(),
            %reason,
            guessed = turn.guesses().len(),
            ?outcome,
            "turn ended"
        );

        self.start_countdown(self.config.turn_countdown_secs, false);
        let state = self.snapshot();
        self.push(
            Recipient::All,
            ServerEvent::TurnEnded {
                reason,
                word: turn.word().map(str::to_owned),
                drawer_id: turn.drawer(),
                state,
            },
        );
        self.push_countdown(self.config.turn_countdown_secs);
    }

    /// Everyone present has drawn: show round results.
    pub(crate) fn complete_round(&mut self) {
        self.transition(RoomStatus::RoundResults);
        self.cycle.all_drawn = true;
        tracing::info!(room = %self.code, round = self.cycle.number, "round complete");

        self.start_countdown(self.config.results_countdown_secs, true);
        let state = self.snapshot();
        self.push(
            Recipient::All,
            ServerEvent::RoundComplete {
                round_number: self.cycle.number,
                rankings: self.rankings(),
                state,
            },
        );
        self.push_countdown(self.config.results_countdown_secs);
    }

    /// Moves to the next round and starts its first turn.
    pub(crate) fn advance_round(&mut self) {
        self.cycle = RoundCycle::starting_at(self.cycle.number + 1);
        tracing::info!(room = %self.code, round = self.cycle.number, "round advanced");
        self.start_next_turn();
    }

    /// Computes final rankings and arms the return to the lobby.
    pub(crate) fn end_game(&mut self) {
        self.transition(RoomStatus::GameComplete);
        self.reset.arm(self.config.reset_delay);
        let final_rankings = self.rankings();
        tracing::info!(room = %self.code, rounds = self.cycle.number, "game complete");
        let state = self.snapshot();
        self.push(Recipient::All, ServerEvent::GameComplete { final_rankings, state });
    }

    /// Back to the lobby with scores and debt zeroed.
    pub(crate) fn reset_to_lobby(&mut self) {
        self.transition(RoomStatus::Lobby);
        self.cycle = RoundCycle::default();
        for player in self.players.values_mut() {
            player.score = 0;
            player.debt = 0;
        }
        tracing::info!(room = %self.code, "room reset to lobby");
        self.broadcast_state();
    }

    fn start_countdown(&mut self, seconds: u32, after_round: bool) {
        self.countdown.start(seconds);
        self.countdown_after_round = after_round;
    }

    pub(crate) fn push_countdown(&mut self, remaining: u32) {
        self.push(
            Recipient::All,
            ServerEvent::Countdown {
                countdown: remaining,
                is_round_complete: self.countdown_after_round,
            },
        );
    }

    /// Auto-progress: the countdown reached zero.
    pub(crate) fn on_countdown_finished(&mut self) {
        let enough_players = self.players.len() >= MIN_PLAYERS;
        match self.status {
            RoomStatus::InRound if !enough_players => self.end_game(),
            RoomStatus::InRound => self.start_next_turn(),
            RoomStatus::RoundResults => {
                if !enough_players || self.cycle.number >= self.settings.total_rounds {
                    self.end_game();
                } else {
                    self.advance_round();
                }
            }
            RoomStatus::Lobby | RoomStatus::GameComplete => {}
        }
    }

    /// Arms the reveal timer if another letter may be shown.
    pub(crate) fn schedule_reveal(&mut self) {
        let cap = self.settings.max_letters_revealed;
        let config = &self.config;
        let Some(turn) = self.turn.as_mut() else {
            return;
        };
        match &turn.mask {
            Some(mask) if mask.can_reveal(cap) => {
                let delay = mask.reveal_delay(config);
                turn.reveal.arm(delay);
            }
            _ => {
                turn.reveal.cancel();
            }
        }
    }

    /// Shows one more letter and re-arms.
    pub(crate) fn reveal_letter(&mut self) {
        let cap = self.settings.max_letters_revealed;
        let Some(turn) = self.turn.as_mut() else {
            return;
        };
        let Some(mask) = turn.mask.as_mut() else {
            return;
        };
        if !mask.can_reveal(cap) || mask.reveal_random(&mut self.rng).is_none() {
            return;
        }
        let rendered = mask.render();
        tracing::trace!(room = %self.code, revealed = mask.revealed(), "letter revealed");

        self.schedule_reveal();
        self.push(
            Recipient::All,
            ServerEvent::MaskUpdate {
                room_id: self.code.clone(),
                mask: rendered,
            },
        );
    }

    /// Moves to `next`, first disarming every timer that belongs to the
    /// status being left. Staying in the same status is a no-op.
    pub(crate) fn transition(&mut self, next: RoomStatus) {
        if self.status == next {
            return;
        }
        if !self.status.can_transition_to(next) {
            tracing::warn!(room = %self.code, from = %self.status, to = %next, "illegal status transition refused");
            return;
        }
        self.leave_status();
        tracing::debug!(room = %self.code, from = %self.status, to = %next, "status changed");
        self.status = next;
    }

    fn leave_status(&mut self) {
        match self.status {
            RoomStatus::InRound => {
                self.turn = None;
                self.countdown.cancel();
            }
            RoomStatus::RoundResults => {
                self.countdown.cancel();
            }
            RoomStatus::GameComplete => {
                self.reset.cancel();
            }
            RoomStatus::Lobby => {}
        }
    }
}
