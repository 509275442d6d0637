//! Per-connection handler: request routing, acknowledgements and event
//! delivery.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The task waits on three things at once:
//!   1. frames from the client → decode → answer with an `ack`
//!   2. events the player's room pushes → forward to the client
//!   3. the idle timer → treat the link as dropped
//!
//! A connection plays in at most one room. Room-scoped events carry no
//! room code; the connection's seat decides where they go.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use inkling_protocol::{
    AckOutcome, ClientEvent, Codec, Envelope, JoinedRoom, PlayerId, RoomCode, ServerEvent,
    Settings,
};
use inkling_room::{PlayerAction, PlayerSender, RoomError, RoomHandle, RoomStore};
use inkling_session::{DisconnectReason, SessionError};
use inkling_transport::{CloseKind, Connection, ConnectionId, Incoming, WebSocketConnection};
use serde::de::IgnoredAny;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::InklingError;
use crate::server::ServerState;

/// The room a connection currently plays in.
struct Seat {
    player_id: PlayerId,
    handle: RoomHandle,
}

/// Drop guard that releases a connection's binding and seat when the
/// handler exits.
///
/// This ensures cleanup happens even if the handler panics or bails out
/// on a send error. Since `Drop` is synchronous, we spawn a
/// fire-and-forget task for the async work.
struct SeatGuard<S: RoomStore> {
    connection: ConnectionId,
    seat: Option<Seat>,
    /// What the room is told when the guard drops. Anything but a clean
    /// close keeps the seat for the grace period.
    reason: DisconnectReason,
    state: Arc<ServerState<S>>,
}

impl<S: RoomStore> SeatGuard<S> {
    /// Forgets the seat without telling the room: the player left, was
    /// kicked, or the room is gone.
    async fn vacate(&mut self) {
        self.seat = None;
        self.state.sessions.lock().await.unbind(self.connection);
    }

    fn ensure_unseated(&self) -> Result<(), SessionError> {
        match self.seat {
            Some(_) => Err(SessionError::AlreadyBound(self.connection)),
            None => Ok(()),
        }
    }
}

impl<S: RoomStore> Drop for SeatGuard<S> {
    fn drop(&mut self) {
        let connection = self.connection;
        let seat = self.seat.take();
        let reason = self.reason;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.sessions.lock().await.unbind(connection);
            let Some(seat) = seat else {
                return;
            };
            if let Err(e) = seat.handle.disconnect(seat.player_id, connection, reason).await {
                tracing::debug!(player_id = %seat.player_id, %connection, error = %e, "disconnect not delivered");
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<S: RoomStore>(
    conn: WebSocketConnection,
    state: Arc<ServerState<S>>,
) -> Result<(), InklingError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let (events_tx, mut events) = mpsc::unbounded_channel();
    let mut guard = SeatGuard {
        connection: conn_id,
        seat: None,
        reason: DisconnectReason::Transient,
        state: Arc::clone(&state),
    };
    let mut seq: u64 = 1;

    let idle = tokio::time::sleep(state.idle_timeout);
    tokio::pin!(idle);

    let close = loop {
        tokio::select! {
            incoming = conn.recv() => match incoming {
                Incoming::Data(data) => {
                    idle.as_mut().reset(Instant::now() + state.idle_timeout);
                    handle_frame(&conn, &state, &mut guard, &events_tx, &data, &mut seq).await?;
                }
                Incoming::Closed(kind) => break kind,
            },
            Some(event) = events.recv() => {
                let terminal = matches!(event, ServerEvent::Kicked | ServerEvent::RoomClosed);
                send_event(&conn, &state, &mut seq, &event).await?;
                if terminal {
                    guard.vacate().await;
                }
            }
            () = &mut idle => {
                tracing::info!(%conn_id, "connection timed out");
                break CloseKind::Transient;
            }
        }
    };

    tracing::info!(%conn_id, ?close, "connection closed");
    guard.reason = close.into();
    // guard drops here → unbind and room disconnect fire.
    Ok(())
}

/// Decodes one frame and answers it.
async fn handle_frame<S: RoomStore>(
    conn: &WebSocketConnection,
    state: &ServerState<S>,
    guard: &mut SeatGuard<S>,
    events_tx: &PlayerSender,
    data: &[u8],
    seq: &mut u64,
) -> Result<(), InklingError> {
    let envelope: Envelope<ClientEvent> = match state.codec.decode(data) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::debug!(conn_id = %conn.id(), error = %e, "failed to decode envelope");
            // Unknown event or bad payload inside a readable envelope: the
            // client still gets an answer for its seq.
            if let Ok(bare) = state.codec.decode::<Envelope<IgnoredAny>>(data) {
                let outcome = InklingError::from(e).outcome();
                let ack = ServerEvent::Ack {
                    seq: bare.seq,
                    outcome,
                };
                send_event(conn, state, seq, &ack).await?;
            }
            return Ok(());
        }
    };

    let request = envelope.seq;
    let event = envelope.payload;
    tracing::trace!(conn_id = %conn.id(), event = event.name(), seq = request, "request received");

    let reply = match event {
        ClientEvent::Heartbeat => ServerEvent::HeartbeatAck {
            server_time: unix_millis(),
        },
        event => {
            let name = event.name();
            let outcome = match dispatch(state, guard, events_tx, event).await {
                Ok(room) => AckOutcome::Ok { room },
                Err(e) => {
                    tracing::debug!(conn_id = %conn.id(), event = name, error = %e, "request refused");
                    e.outcome()
                }
            };
            ServerEvent::Ack {
                seq: request,
                outcome,
            }
        }
    };
    send_event(conn, state, seq, &reply).await
}

/// Runs one request. Create, join and rejoin return the seat they took.
async fn dispatch<S: RoomStore>(
    state: &ServerState<S>,
    guard: &mut SeatGuard<S>,
    events_tx: &PlayerSender,
    event: ClientEvent,
) -> Result<Option<JoinedRoom>, InklingError> {
    let connection = guard.connection;
    match event {
        ClientEvent::CreateRoom { name, settings } => {
            guard.ensure_unseated()?;
            let settings = Settings::from_request(settings);
            let (handle, joined) = state.rooms.lock().await.create(
                name.as_deref(),
                settings,
                connection,
                events_tx.clone(),
            );
            tracing::info!(room = %joined.room_id, player_id = %joined.player_id, "room created");
            take_seat(state, guard, handle, &joined).await?;
            Ok(Some(joined))
        }

        ClientEvent::JoinRoom { room_id, name } => {
            guard.ensure_unseated()?;
            let handle = find_room(state, &room_id).await?;
            let joined = handle.join(name, connection, events_tx.clone()).await?;
            tracing::info!(room = %joined.room_id, player_id = %joined.player_id, "player joined");
            take_seat(state, guard, handle, &joined).await?;
            Ok(Some(joined))
        }

        ClientEvent::RejoinRoom {
            room_id,
            player_name,
        } => {
            guard.ensure_unseated()?;
            let handle = find_room(state, &room_id).await?;
            let joined = handle
                .rejoin(player_name, connection, events_tx.clone())
                .await?;
            tracing::info!(room = %joined.room_id, player_id = %joined.player_id, "player rejoined");
            take_seat(state, guard, handle, &joined).await?;
            Ok(Some(joined))
        }

        event => {
            let Some(action) = player_action(event) else {
                return Ok(None);
            };
            let seat = guard
                .seat
                .as_ref()
                .ok_or(SessionError::NotBound(connection))?;
            let speaks_for_seat = state
                .sessions
                .lock()
                .await
                .get(connection)
                .is_some_and(|s| s.player_id == seat.player_id);
            if !speaks_for_seat {
                // A rejoin elsewhere took the player over.
                tracing::debug!(%connection, player_id = %seat.player_id, "seat held by a newer connection");
                guard.seat = None;
                return Err(SessionError::NotBound(connection).into());
            }
            let vacates = matches!(action, PlayerAction::Leave | PlayerAction::Close);
            seat.handle.act(seat.player_id, action).await?;
            if vacates {
                guard.vacate().await;
            }
            Ok(None)
        }
    }
}

/// Maps a room-scoped client event onto the room's action set.
fn player_action(event: ClientEvent) -> Option<PlayerAction> {
    let action = match event {
        ClientEvent::KickPlayer { target_id } => PlayerAction::Kick { target: target_id },
        ClientEvent::LeaveRoom => PlayerAction::Leave,
        ClientEvent::CloseRoom => PlayerAction::Close,
        ClientEvent::StartGame => PlayerAction::StartGame,
        ClientEvent::SelectWord { word } => PlayerAction::SelectWord { word },
        ClientEvent::DrawStroke { stroke } => PlayerAction::DrawStroke(stroke),
        ClientEvent::DrawFill(fill) => PlayerAction::DrawFill(fill),
        ClientEvent::ClearCanvas => PlayerAction::ClearCanvas,
        ClientEvent::Chat { text } => PlayerAction::Chat { text },
        ClientEvent::EndTurn { reason } => PlayerAction::EndTurn { reason },
        ClientEvent::CreateRoom { .. }
        | ClientEvent::JoinRoom { .. }
        | ClientEvent::RejoinRoom { .. }
        | ClientEvent::Heartbeat => return None,
    };
    Some(action)
}

async fn find_room<S: RoomStore>(
    state: &ServerState<S>,
    room_id: &str,
) -> Result<RoomHandle, InklingError> {
    let code = RoomCode::parse(room_id)?;
    let handle = state.rooms.lock().await.get(&code);
    handle.ok_or_else(|| RoomError::NotFound(code).into())
}

/// Binds the connection to the seat the room just handed out.
async fn take_seat<S: RoomStore>(
    state: &ServerState<S>,
    guard: &mut SeatGuard<S>,
    handle: RoomHandle,
    joined: &JoinedRoom,
) -> Result<(), InklingError> {
    let displaced = state.sessions.lock().await.bind(
        guard.connection,
        joined.player_id,
        joined.room_id.clone(),
    )?;
    if let Some(old) = displaced {
        tracing::info!(room = %joined.room_id, player_id = %joined.player_id, %old, "older connection displaced");
    }
    guard.seat = Some(Seat {
        player_id: joined.player_id,
        handle,
    });
    Ok(())
}

/// Wraps `event` in an envelope and sends it.
async fn send_event<S: RoomStore>(
    conn: &WebSocketConnection,
    state: &ServerState<S>,
    seq: &mut u64,
    event: &ServerEvent,
) -> Result<(), InklingError> {
    let envelope = Envelope {
        seq: next_seq(seq),
        timestamp: u64::try_from(state.started.elapsed().as_millis()).unwrap_or(u64::MAX),
        payload: event,
    };
    let bytes = state.codec.encode(&envelope)?;
    conn.send(&bytes).await?;
    Ok(())
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_next_seq_returns_current_then_increments() {
        let mut seq = 1;
        assert_eq!(next_seq(&mut seq), 1);
        assert_eq!(next_seq(&mut seq), 2);
        assert_eq!(seq, 3);
    }

    #[test]
    fn test_player_action_maps_room_scoped_events() {
        assert_eq!(
            player_action(ClientEvent::KickPlayer {
                target_id: PlayerId(4)
            }),
            Some(PlayerAction::Kick {
                target: PlayerId(4)
            })
        );
        assert_eq!(
            player_action(ClientEvent::DrawStroke {
                stroke: json!({ "points": [] })
            }),
            Some(PlayerAction::DrawStroke(json!({ "points": [] })))
        );
        assert_eq!(
            player_action(ClientEvent::Chat { text: "hi".into() }),
            Some(PlayerAction::Chat { text: "hi".into() })
        );
    }

    #[test]
    fn test_player_action_seat_requests_return_none() {
        assert_eq!(player_action(ClientEvent::Heartbeat), None);
        assert_eq!(
            player_action(ClientEvent::JoinRoom {
                room_id: "ABCDEF".into(),
                name: None
            }),
            None
        );
    }
}
