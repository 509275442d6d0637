//! The room aggregate: the only place a game's state is mutated.
//!
//! A [`Room`] is plain data plus methods. It never awaits and never sends
//! anything itself: every operation appends `(Recipient, ServerEvent)` pairs
//! to an outbox that the owning actor drains and delivers. Timers are values
//! inside the room, fired by the actor through [`Room::fire_due`].
//!
//! ```text
//! command ──→ Room::<operation>() ──→ outbox ──→ actor dispatch ──→ players
//! deadline ─→ Room::fire_due()    ──┘
//! ```

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use inkling_protocol::{
    ChatMessage, GameView, MAX_CHAT_LEN, PlayerId, PlayerView, Ranking, Recipient,
    RoomCode, RoomSnapshot, RoomStatus, ServerEvent, Settings, TurnEndReason, normalize_name,
    truncate_chars,
};
use inkling_session::{DisconnectReason, GracePeriods};
use inkling_timer::{Countdown, Timer};
use rand::Rng;
use rand::rngs::StdRng;
use serde_json::Value;
use tokio::time::Instant;

use crate::mask::Mask;
use crate::turn::{CorrectGuess, Turn};
use crate::{EngineConfig, RoomError};

/// Counter for generating unique player IDs.
static NEXT_PLAYER_ID: AtomicU64 = AtomicU64::new(1);

fn next_player_id() -> PlayerId {
    PlayerId(NEXT_PLAYER_ID.fetch_add(1, Ordering::Relaxed))
}

/// Wall-clock Unix milliseconds, as shown to clients.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

const HOST_FALLBACK_NAME: &str = "Host";
const PLAYER_FALLBACK_NAME: &str = "Player";

/// A seat in a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// May go negative.
    pub score: i64,
    /// Total negative overflow. Only ever grows until the room resets.
    pub debt: u64,
    /// `false` while inside a reconnection grace period.
    pub connected: bool,
}

impl Player {
    fn new(name: String) -> Self {
        Self {
            id: next_player_id(),
            name,
            score: 0,
            debt: 0,
            connected: true,
        }
    }
}

/// Something a room timer asks the room to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// The turn's time limit elapsed.
    TurnExpired,
    /// Time to reveal another letter.
    RevealLetter,
    /// One second of the auto-progress countdown.
    CountdownTick,
    /// Final rankings have been up long enough.
    ResetToLobby,
    /// A dropped player did not come back in time.
    GraceExpired(PlayerId),
}

/// Which players drew in the current round.
#[derive(Debug, Clone, Default)]
pub(crate) struct RoundCycle {
    /// 1-based while a game runs, 0 in the lobby.
    pub(crate) number: u32,
    pub(crate) has_drawn: HashSet<PlayerId>,
    pub(crate) all_drawn: bool,
}

impl RoundCycle {
    pub(crate) fn starting_at(number: u32) -> Self {
        Self {
            number,
            ..Self::default()
        }
    }
}

/// One game session.
#[derive(Debug)]
pub struct Room {
    pub(crate) code: RoomCode,
    pub(crate) settings: Settings,
    pub(crate) config: EngineConfig,
    pub(crate) status: RoomStatus,
    /// Ordered by id, which is join order.
    pub(crate) players: BTreeMap<PlayerId, Player>,
    pub(crate) host: PlayerId,
    pub(crate) turn: Option<Turn>,
    pub(crate) cycle: RoundCycle,
    pub(crate) countdown: Countdown,
    /// Whether the running countdown follows a completed round.
    pub(crate) countdown_after_round: bool,
    pub(crate) reset: Timer,
    pub(crate) grace: GracePeriods,
    pub(crate) rng: StdRng,
    outbox: Vec<(Recipient, ServerEvent)>,
    closed: bool,
}

impl Room {
    /// Creates a room in the lobby with its host already seated.
    pub fn create(
        code: RoomCode,
        host_name: Option<&str>,
        settings: Settings,
        config: EngineConfig,
        rng: StdRng,
    ) -> Self {
        let host = Player::new(normalize_name(host_name, HOST_FALLBACK_NAME));
        let host_id = host.id;
        let grace = GracePeriods::new(config.reconnect_grace);

        let mut room = Self {
            code,
            settings,
            config,
            status: RoomStatus::Lobby,
            players: BTreeMap::from([(host_id, host)]),
            host: host_id,
            turn: None,
            cycle: RoundCycle::default(),
            countdown: Countdown::idle(),
            countdown_after_round: false,
            reset: Timer::disarmed(),
            grace,
            rng,
            outbox: Vec::new(),
            closed: false,
        };
        tracing::info!(room = %room.code, host = %host_id, "room created");
        room.broadcast_state();
        room
    }

    // =====================================================================
    // Queries
    // =====================================================================

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn host(&self) -> PlayerId {
        self.host
    }

    pub fn status(&self) -> RoomStatus {
        self.status
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn player_named(&self, name: &str) -> Option<&Player> {
        self.players.values().find(|p| p.name == name)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.players.contains_key(&id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// The active turn, if a drawer is assigned.
    pub fn turn(&self) -> Option<&Turn> {
        self.turn.as_ref()
    }

    /// Current round ordinal. Zero in the lobby.
    pub fn round_number(&self) -> u32 {
        self.cycle.number
    }

    /// Whether `player` already drew this round.
    pub fn has_drawn(&self, player: PlayerId) -> bool {
        self.cycle.has_drawn.contains(&player)
    }

    /// Seconds left on the auto-progress countdown.
    pub fn countdown_remaining(&self) -> Option<u32> {
        self.countdown.remaining()
    }

    /// Whether `player` is inside a reconnection grace period.
    pub fn is_grace_pending(&self, player: PlayerId) -> bool {
        self.grace.is_pending(player)
    }

    /// A closed room accepts nothing and should be dropped.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Drains the events produced since the last call.
    pub fn take_outbox(&mut self) -> Vec<(Recipient, ServerEvent)> {
        std::mem::take(&mut self.outbox)
    }

    /// The full client-visible state.
    pub fn snapshot(&self) -> RoomSnapshot {
        let drawer = self.turn.as_ref().map(Turn::drawer);
        RoomSnapshot {
            id: self.code.clone(),
            host_id: self.host,
            settings: self.settings.clone(),
            status: self.status,
            players: self
                .players
                .values()
                .map(|p| PlayerView {
                    id: p.id,
                    name: p.name.clone(),
                    score: p.score,
                    debt: p.debt,
                    is_host: p.id == self.host,
                    is_drawer: drawer == Some(p.id),
                    connected: p.connected,
                    has_drawn_this_round: self.cycle.has_drawn.contains(&p.id),
                })
                .collect(),
            current_round: self.turn.as_ref().map(Turn::view),
            game_state: GameView {
                current_round_number: self.cycle.number,
                total_rounds: self.settings.total_rounds,
                all_drawers_completed: self.cycle.all_drawn,
                auto_progress_countdown: self.countdown.remaining(),
            },
        }
    }

    /// Players by score, highest first. Ties keep join order.
    pub fn rankings(&self) -> Vec<Ranking> {
        let mut players: Vec<&Player> = self.players.values().collect();
        players.sort_by(|a, b| b.score.cmp(&a.score));
        players
            .into_iter()
            .enumerate()
            .map(|(i, p)| Ranking {
                rank: i + 1,
                id: p.id,
                name: p.name.clone(),
                score: p.score,
                debt: p.debt,
            })
            .collect()
    }

    // =====================================================================
    // Membership
    // =====================================================================

    /// Seats a new player.
    ///
    /// # Errors
    /// [`RoomError::RoomFull`] at capacity, [`RoomError::NameTaken`] if the
    /// normalized name is already used in this room.
    pub fn join(&mut self, name: Option<&str>) -> Result<PlayerId, RoomError> {
        self.ensure_open()?;
        if self.players.len() >= self.settings.max_players {
            return Err(RoomError::RoomFull(self.code.clone()));
        }
        let name = normalize_name(name, PLAYER_FALLBACK_NAME);
        if self.player_named(&name).is_some() {
            return Err(RoomError::NameTaken(name));
        }

        let player = Player::new(name);
        let id = player.id;
        tracing::info!(
            room = %self.code,
            player_id = %id,
            name = %player.name,
            players = self.players.len() + 1,
            "player joined"
        );
        self.players.insert(id, player);
        self.send_replay(id);
        self.broadcast_state();
        Ok(id)
    }

    /// Reclaims the seat of the player called `name`.
    ///
    /// Score, debt, host and drawer role all live on the stable player id,
    /// so nothing needs re-keying: the grace timer is cancelled and the
    /// player is marked connected again.
    ///
    /// # Errors
    /// [`RoomError::PlayerNotFound`] if nobody in the room has that name.
    pub fn rejoin(&mut self, name: &str) -> Result<PlayerId, RoomError> {
        self.ensure_open()?;
        let name = normalize_name(Some(name), PLAYER_FALLBACK_NAME);
        let id = self
            .player_named(&name)
            .map(|p| p.id)
            .ok_or_else(|| RoomError::PlayerNotFound(name.clone()))?;

        self.grace.cancel(id);
        if let Some(player) = self.players.get_mut(&id) {
            player.connected = true;
        }
        tracing::info!(room = %self.code, player_id = %id, "player rejoined");

        let pending_options = self
            .turn
            .as_ref()
            .filter(|t| t.drawer() == id && t.word().is_none())
            .map(|t| t.options().to_vec());
        if let Some(words) = pending_options {
            self.push(Recipient::Player(id), ServerEvent::WordOptions { words });
        }
        self.send_replay(id);
        self.broadcast_state();
        Ok(id)
    }

    /// Removes `player` at their own request.
    pub fn leave(&mut self, player: PlayerId) -> Result<(), RoomError> {
        self.ensure_open()?;
        self.require_member(player)?;
        self.grace.cancel(player);
        self.remove_player(player, "left");
        Ok(())
    }

    /// Host only: removes `target`, who is told with `room:kicked`.
    pub fn kick(&mut self, by: PlayerId, target: PlayerId) -> Result<(), RoomError> {
        self.ensure_open()?;
        self.require_host(by)?;
        self.require_member(target)?;
        if target == self.host {
            return Err(RoomError::InvalidInput("the host cannot kick themselves".into()));
        }
        self.push(Recipient::Player(target), ServerEvent::Kicked);
        self.grace.cancel(target);
        self.remove_player(target, "kicked");
        Ok(())
    }

    /// Host only: destroys the room for everyone.
    pub fn close(&mut self, by: PlayerId) -> Result<(), RoomError> {
        self.ensure_open()?;
        self.require_host(by)?;
        self.destroy("closed by host");
        Ok(())
    }

    /// Handles a lost connection.
    ///
    /// Deliberate disconnects remove the player at once. Transient ones
    /// keep the seat and start a grace period; the player is removed only
    /// if it expires before they rejoin.
    pub fn disconnect(&mut self, player: PlayerId, reason: DisconnectReason) -> Result<(), RoomError> {
        self.ensure_open()?;
        self.require_member(player)?;
        match reason {
            DisconnectReason::Deliberate => {
                self.grace.cancel(player);
                self.remove_player(player, "disconnected");
            }
            DisconnectReason::Transient => {
                if let Some(p) = self.players.get_mut(&player) {
                    p.connected = false;
                }
                self.grace.start(player);
                tracing::info!(room = %self.code, player_id = %player, "player disconnected, seat held");
                self.broadcast_state();
            }
        }
        Ok(())
    }

    /// Closes the room from outside, e.g. when the registry drops it.
    pub fn shutdown(&mut self) {
        if !self.closed {
            self.destroy("shut down");
        }
    }

    // =====================================================================
    // Game flow
    // =====================================================================

    /// Host only, from the lobby, with at least two players.
    pub fn start_game(&mut self, by: PlayerId) -> Result<(), RoomError> {
        self.ensure_open()?;
        self.require_host(by)?;
        if self.status != RoomStatus::Lobby {
            return Err(RoomError::InvalidState(format!("cannot start from {}", self.status)));
        }
        if self.players.len() < 2 {
            return Err(RoomError::InvalidState("at least two players are needed".into()));
        }
        tracing::info!(room = %self.code, players = self.players.len(), "game started");
        self.cycle = RoundCycle::starting_at(1);
        self.start_next_turn();
        Ok(())
    }

    /// Drawer only: fixes the secret word and starts guessing.
    ///
    /// A second selection in the same turn is rejected as stale, which
    /// makes repeated requests harmless.
    pub fn select_word(&mut self, by: PlayerId, word: &str) -> Result<(), RoomError> {
        self.ensure_open()?;
        let max_len = self.settings.max_word_length;
        let turn = self.active_turn_mut()?;
        if turn.drawer() != by {
            return Err(RoomError::NotAuthorized("drawer"));
        }
        if turn.word.is_some() {
            return Err(RoomError::InvalidState("word already chosen".into()));
        }
        let word = truncate_chars(&word.trim().to_lowercase(), max_len);
        if word.trim().is_empty() {
            return Err(RoomError::InvalidInput("word is empty".into()));
        }

        let mask = Mask::new(&word);
        let rendered = mask.render();
        turn.word = Some(word);
        turn.mask = Some(mask);
        let drawer_id = turn.drawer();
        let ends_at = turn.ends_at();
        tracing::info!(room = %self.code, drawer = %drawer_id, "word selected");

        self.schedule_reveal();
        self.push(
            Recipient::All,
            ServerEvent::MaskUpdate {
                room_id: self.code.clone(),
                mask: rendered.clone(),
            },
        );
        self.push(
            Recipient::All,
            ServerEvent::TurnStarted {
                drawer_id,
                ends_at,
                mask: rendered,
            },
        );
        self.broadcast_state();
        Ok(())
    }

    /// Drawer only: records a stroke and relays it to everyone else.
    pub fn draw_stroke(&mut self, by: PlayerId, stroke: Value) -> Result<(), RoomError> {
        self.ensure_open()?;
        let turn = self.active_turn_mut()?;
        if turn.drawer() != by {
            return Err(RoomError::NotAuthorized("drawer"));
        }
        turn.strokes.push(stroke.clone());
        tracing::trace!(room = %self.code, "stroke relayed");
        self.push(Recipient::AllExcept(by), ServerEvent::Stroke(stroke));
        Ok(())
    }

    /// Drawer only: relays a flood fill to everyone else.
    pub fn draw_fill(&mut self, by: PlayerId, fill: Value) -> Result<(), RoomError> {
        self.ensure_open()?;
        let turn = self.active_turn_mut()?;
        if turn.drawer() != by {
            return Err(RoomError::NotAuthorized("drawer"));
        }
        self.push(Recipient::AllExcept(by), ServerEvent::Fill(fill));
        Ok(())
    }

    /// Drawer or host: wipes the canvas and the stroke log.
    pub fn clear_canvas(&mut self, by: PlayerId) -> Result<(), RoomError> {
        self.ensure_open()?;
        let host = self.host;
        let turn = self.active_turn_mut()?;
        if turn.drawer() != by && host != by {
            return Err(RoomError::NotAuthorized("drawer or host"));
        }
        turn.strokes.clear();
        self.push(Recipient::All, ServerEvent::ClearCanvas);
        Ok(())
    }

    /// A chat line. If it is the secret word, sent by a guesser who has not
    /// guessed yet, it is swallowed and announced as a correct guess.
    pub fn chat(&mut self, by: PlayerId, text: &str) -> Result<(), RoomError> {
        self.ensure_open()?;
        let name = self.require_member(by)?.name.clone();
        let text = truncate_chars(text, MAX_CHAT_LEN);
        if text.trim().is_empty() {
            return Err(RoomError::InvalidInput("message is empty".into()));
        }

        if self.is_correct_guess(by, &text) {
            self.record_guess(by);
            return Ok(());
        }

        let id = format!("{:016x}", self.rng.random::<u64>());
        self.push(
            Recipient::All,
            ServerEvent::Chat(ChatMessage {
                id,
                player_id: by,
                name,
                text,
            }),
        );
        Ok(())
    }

    /// Host only: ends the current turn now.
    pub fn end_turn(&mut self, by: PlayerId, reason: Option<TurnEndReason>) -> Result<(), RoomError> {
        self.ensure_open()?;
        self.require_host(by)?;
        self.active_turn_mut()?;
        self.finish_turn(reason.unwrap_or(TurnEndReason::Host));
        Ok(())
    }

    // =====================================================================
    // Timers
    // =====================================================================

    /// The earliest armed deadline across every timer the room owns.
    pub fn next_deadline(&self) -> Option<Instant> {
        let turn = self.turn.as_ref();
        inkling_timer::earliest([
            turn.and_then(|t| t.expiry.deadline()),
            turn.and_then(|t| t.reveal.deadline()),
            self.countdown.deadline(),
            self.reset.deadline(),
            self.grace.next_deadline(),
        ])
    }

    /// Fires every timer whose deadline is at or before `now`.
    pub fn fire_due(&mut self, now: Instant) {
        while let Some(event) = self.next_due(now) {
            self.fire(event);
            if self.closed {
                break;
            }
        }
    }

    fn next_due(&self, now: Instant) -> Option<TimerEvent> {
        if let Some(turn) = &self.turn {
            if turn.expiry.is_due(now) {
                return Some(TimerEvent::TurnExpired);
            }
            if turn.reveal.is_due(now) {
                return Some(TimerEvent::RevealLetter);
            }
        }
        if self.countdown.deadline().is_some_and(|d| d <= now) {
            return Some(TimerEvent::CountdownTick);
        }
        if self.reset.is_due(now) {
            return Some(TimerEvent::ResetToLobby);
        }
        self.grace.first_due(now).map(TimerEvent::GraceExpired)
    }

    /// Fires one timer regardless of its deadline.
    ///
    /// A timer that is no longer armed (its turn ended, its countdown was
    /// cancelled, its player rejoined) is a no-op.
    pub fn fire(&mut self, event: TimerEvent) {
        if self.closed {
            return;
        }
        tracing::trace!(room = %self.code, ?event, "timer fired");
        match event {
            TimerEvent::TurnExpired => {
                if self.turn.as_mut().is_some_and(|t| t.expiry.fire()) {
                    self.finish_turn(TurnEndReason::TimeUp);
                }
            }
            TimerEvent::RevealLetter => {
                if self.turn.as_mut().is_some_and(|t| t.reveal.fire()) {
                    self.reveal_letter();
                }
            }
            TimerEvent::CountdownTick => {
                if let Some(tick) = self.countdown.fire() {
                    self.push_countdown(tick.remaining);
                    if tick.finished {
                        self.on_countdown_finished();
                    }
                }
            }
            TimerEvent::ResetToLobby => {
                if self.reset.fire() {
                    self.reset_to_lobby();
                }
            }
            TimerEvent::GraceExpired(player) => {
                if self.grace.expire(player) {
                    tracing::info!(room = %self.code, player_id = %player, "grace period expired");
                    self.remove_player(player, "grace expired");
                }
            }
        }
    }

    // =====================================================================
    // Internals
    // =====================================================================

    pub(crate) fn push(&mut self, to: Recipient, event: ServerEvent) {
        self.outbox.push((to, event));
    }

    pub(crate) fn broadcast_state(&mut self) {
        let snapshot = self.snapshot();
        self.push(Recipient::All, ServerEvent::RoomState(snapshot));
    }

    fn ensure_open(&self) -> Result<(), RoomError> {
        if self.closed {
            Err(RoomError::Unavailable(self.code.clone()))
        } else {
            Ok(())
        }
    }

    fn require_member(&self, player: PlayerId) -> Result<&Player, RoomError> {
        self.players.get(&player).ok_or(RoomError::NotInRoom(player))
    }

    fn require_host(&self, player: PlayerId) -> Result<(), RoomError> {
        if player == self.host {
            Ok(())
        } else {
            Err(RoomError::NotAuthorized("host"))
        }
    }

    fn active_turn_mut(&mut self) -> Result<&mut Turn, RoomError> {
        self.turn
            .as_mut()
            .ok_or_else(|| RoomError::InvalidState("no turn in progress".into()))
    }

    fn send_replay(&mut self, player: PlayerId) {
        let strokes = match &self.turn {
            Some(turn) if !turn.strokes().is_empty() => turn.strokes().to_vec(),
            _ => return,
        };
        self.push(Recipient::Player(player), ServerEvent::Replay { strokes });
    }

    fn is_correct_guess(&self, by: PlayerId, text: &str) -> bool {
        let Some(turn) = &self.turn else {
            return false;
        };
        let Some(word) = turn.word() else {
            return false;
        };
        turn.drawer() != by && !turn.has_guessed(by) && text.trim().to_lowercase() == word
    }

    fn record_guess(&mut self, by: PlayerId) {
        let Some(turn) = self.turn.as_mut() else {
            return;
        };
        turn.guesses.push(CorrectGuess {
            player_id: by,
            at: now_millis(),
        });
        let order = turn.guesses.len();
        tracing::info!(room = %self.code, player_id = %by, order, "correct guess");
        self.push(Recipient::All, ServerEvent::CorrectGuess { player_id: by });
        self.broadcast_state();
        if self.all_guessed() {
            self.finish_turn(TurnEndReason::AllGuessed);
        }
    }

    /// Every present non-drawer has guessed. `false` with no guessers.
    fn all_guessed(&self) -> bool {
        let Some(turn) = &self.turn else {
            return false;
        };
        if turn.word().is_none() {
            return false;
        }
        let mut guessers = self.players.keys().filter(|p| **p != turn.drawer()).peekable();
        guessers.peek().is_some() && guessers.all(|p| turn.has_guessed(*p))
    }

    /// Removes a player for good. Removing the host destroys the room.
    pub(crate) fn remove_player(&mut self, player: PlayerId, why: &'static str) {
        if player == self.host {
            self.destroy("host left");
            return;
        }
        if self.players.remove(&player).is_none() {
            return;
        }
        tracing::info!(room = %self.code, player_id = %player, why, players = self.players.len(), "player removed");

        let drawer_left = self.turn.as_ref().is_some_and(|t| t.drawer() == player);
        if drawer_left {
            self.finish_turn(TurnEndReason::DrawerLeft);
        } else if self.all_guessed() {
            self.finish_turn(TurnEndReason::AllGuessed);
        }
        self.broadcast_state();
    }

    /// Tells everyone the room is gone and disarms every timer.
    fn destroy(&mut self, why: &'static str) {
        self.push(Recipient::All, ServerEvent::RoomClosed);
        self.turn = None;
        self.countdown.cancel();
        self.reset.cancel();
        self.grace.clear();
        self.closed = true;
        tracing::info!(room = %self.code, why, "room closed");
    }
}
