//! Room actor: an isolated Tokio task that owns one [`Room`].
//!
//! Each room runs in its own task and talks to the outside world through
//! an mpsc channel. Commands and timer firings are processed one at a time,
//! so a room's state transitions never interleave.

use std::collections::HashMap;

use inkling_protocol::{
    JoinedRoom, PlayerId, Recipient, RoomCode, RoomStatus, ServerEvent, TurnEndReason,
};
use inkling_session::DisconnectReason;
use inkling_transport::ConnectionId;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::{Room, RoomError};

/// Channel sender for delivering server events to a player's connection
/// handler.
pub type PlayerSender = mpsc::UnboundedSender<ServerEvent>;

/// A request from a seated player.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerAction {
    Leave,
    Kick { target: PlayerId },
    Close,
    StartGame,
    SelectWord { word: String },
    DrawStroke(Value),
    DrawFill(Value),
    ClearCanvas,
    Chat { text: String },
    EndTurn { reason: Option<TurnEndReason> },
}

/// Commands sent to a room actor through its channel.
///
/// Variants with a `oneshot::Sender` expect an answer.
pub(crate) enum RoomCommand {
    Join {
        name: Option<String>,
        connection: ConnectionId,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<JoinedRoom, RoomError>>,
    },
    Rejoin {
        player_name: String,
        connection: ConnectionId,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<JoinedRoom, RoomError>>,
    },
    Action {
        player: PlayerId,
        action: PlayerAction,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    /// Ignored unless `connection` is still the one bound to `player`.
    Disconnect {
        player: PlayerId,
        connection: ConnectionId,
        reason: DisconnectReason,
    },
    GetInfo {
        reply: oneshot::Sender<RoomInfo>,
    },
    Shutdown,
}

/// Room metadata, without the game state.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub code: RoomCode,
    pub status: RoomStatus,
    pub player_count: usize,
    pub max_players: usize,
    pub host: PlayerId,
}

/// Handle to a running room actor.
///
/// Cheap to clone: it wraps an `mpsc::Sender`.
#[derive(Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.code.clone())
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Seats a new player whose events go to `sender`.
    pub async fn join(
        &self,
        name: Option<String>,
        connection: ConnectionId,
        sender: PlayerSender,
    ) -> Result<JoinedRoom, RoomError> {
        self.request(|reply| RoomCommand::Join {
            name,
            connection,
            sender,
            reply,
        })
        .await?
    }

    /// Reclaims a seat by display name. Events now go to `sender`.
    pub async fn rejoin(
        &self,
        player_name: String,
        connection: ConnectionId,
        sender: PlayerSender,
    ) -> Result<JoinedRoom, RoomError> {
        self.request(|reply| RoomCommand::Rejoin {
            player_name,
            connection,
            sender,
            reply,
        })
        .await?
    }

    /// Runs a player action and waits for its outcome.
    pub async fn act(&self, player: PlayerId, action: PlayerAction) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Action {
            player,
            action,
            reply,
        })
        .await?
    }

    /// Reports a lost connection (fire-and-forget).
    pub async fn disconnect(
        &self,
        player: PlayerId,
        connection: ConnectionId,
        reason: DisconnectReason,
    ) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Disconnect {
                player,
                connection,
                reason,
            })
            .await
            .map_err(|_| self.unavailable())
    }

    pub async fn get_info(&self) -> Result<RoomInfo, RoomError> {
        self.request(|reply| RoomCommand::GetInfo { reply }).await
    }

    /// Tells the room to close.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| self.unavailable())
    }

    /// Non-blocking [`shutdown`](Self::shutdown) for synchronous callers.
    pub(crate) fn try_shutdown(&self) -> bool {
        self.sender.try_send(RoomCommand::Shutdown).is_ok()
    }
}

/// Spawns an actor for `room`. The host is already seated and receives
/// events through `host_sender`.
pub(crate) fn spawn_room(
    room: Room,
    host_connection: ConnectionId,
    host_sender: PlayerSender,
    channel_size: usize,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);
    let code = room.code().clone();
    let senders = HashMap::from([(room.host(), (host_connection, host_sender))]);
    let actor = RoomActor {
        room,
        senders,
        receiver: rx,
    };
    tokio::spawn(actor.run());
    RoomHandle { code, sender: tx }
}

/// The internal actor state. Runs inside a Tokio task.
struct RoomActor {
    room: Room,
    /// Where each seated player's events go, and which connection that is.
    senders: HashMap<PlayerId, (ConnectionId, PlayerSender)>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    /// Processes commands and timer deadlines until the room closes.
    async fn run(mut self) {
        tracing::info!(room = %self.room.code(), "room actor started");
        self.flush();

        while !self.room.is_closed() {
            let deadline = self.room.next_deadline();
            tokio::select! {
                command = self.receiver.recv() => match command {
                    Some(command) => self.handle(command),
                    None => self.room.shutdown(),
                },
                () = inkling_timer::sleep_until(deadline) => {
                    self.room.fire_due(Instant::now());
                }
            }
            self.flush();
        }

        tracing::info!(room = %self.room.code(), "room actor stopped");
    }

    fn handle(&mut self, command: RoomCommand) {
        match command {
            RoomCommand::Join {
                name,
                connection,
                sender,
                reply,
            } => {
                let result = self.room.join(name.as_deref()).map(|player_id| {
                    self.senders.insert(player_id, (connection, sender));
                    self.joined(player_id)
                });
                let _ = reply.send(result);
            }
            RoomCommand::Rejoin {
                player_name,
                connection,
                sender,
                reply,
            } => {
                let result = self.room.rejoin(&player_name).map(|player_id| {
                    let previous = self.senders.insert(player_id, (connection, sender));
                    if let Some((old, _)) = previous.filter(|(old, _)| *old != connection) {
                        tracing::debug!(room = %self.room.code(), %player_id, %old, new = %connection, "older connection detached");
                    }
                    self.joined(player_id)
                });
                let _ = reply.send(result);
            }
            RoomCommand::Action {
                player,
                action,
                reply,
            } => {
                let result = self.apply(player, action);
                if let Err(e) = &result {
                    tracing::debug!(room = %self.room.code(), %player, error = %e, "action refused");
                }
                let _ = reply.send(result);
            }
            RoomCommand::Disconnect {
                player,
                connection,
                reason,
            } => {
                let current = self.senders.get(&player).map(|(c, _)| *c);
                if current != Some(connection) {
                    tracing::debug!(room = %self.room.code(), %player, %connection, "stale disconnect ignored");
                    return;
                }
                self.senders.remove(&player);
                if let Err(e) = self.room.disconnect(player, reason) {
                    tracing::debug!(room = %self.room.code(), %player, error = %e, "disconnect ignored");
                }
            }
            RoomCommand::GetInfo { reply } => {
                let _ = reply.send(self.info());
            }
            RoomCommand::Shutdown => {
                tracing::info!(room = %self.room.code(), "room shutting down");
                self.room.shutdown();
            }
        }
    }

    fn apply(&mut self, player: PlayerId, action: PlayerAction) -> Result<(), RoomError> {
        let room = &mut self.room;
        match action {
            PlayerAction::Leave => room.leave(player),
            PlayerAction::Kick { target } => room.kick(player, target),
            PlayerAction::Close => room.close(player),
            PlayerAction::StartGame => room.start_game(player),
            PlayerAction::SelectWord { word } => room.select_word(player, &word),
            PlayerAction::DrawStroke(stroke) => room.draw_stroke(player, stroke),
            PlayerAction::DrawFill(fill) => room.draw_fill(player, fill),
            PlayerAction::ClearCanvas => room.clear_canvas(player),
            PlayerAction::Chat { text } => room.chat(player, &text),
            PlayerAction::EndTurn { reason } => room.end_turn(player, reason),
        }
    }

    fn joined(&self, player_id: PlayerId) -> JoinedRoom {
        JoinedRoom {
            room_id: self.room.code().clone(),
            player_id,
            state: self.room.snapshot(),
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            code: self.room.code().clone(),
            status: self.room.status(),
            player_count: self.room.player_count(),
            max_players: self.room.settings().max_players,
            host: self.room.host(),
        }
    }

    /// Delivers the room's outbox, then forgets senders of players who are
    /// gone. Explicit `Player` recipients are served even if they were just
    /// removed, so a kicked player still hears about it.
    fn flush(&mut self) {
        for (recipient, event) in self.room.take_outbox() {
            if let Recipient::Player(player) = recipient {
                self.deliver(player, event);
                continue;
            }
            let targets: Vec<PlayerId> = self
                .senders
                .keys()
                .copied()
                .filter(|p| recipient.includes(*p) && self.room.contains(*p))
                .collect();
            for player in targets {
                self.deliver(player, event.clone());
            }
        }

        let room = &self.room;
        self.senders
            .retain(|player, _| !room.is_closed() && room.contains(*player));
    }

    fn deliver(&self, player: PlayerId, event: ServerEvent) {
        let Some((connection, sender)) = self.senders.get(&player) else {
            return;
        };
        if sender.send(event).is_err() {
            tracing::warn!(room = %self.room.code(), %player, %connection, "dropping event for unreachable player");
        }
    }
}
