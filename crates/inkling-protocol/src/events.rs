//! Client and server events.
//!
//! Both directions use adjacently tagged JSON:
//!
//! ```text
//! { "event": "round:selectWord", "data": { "word": "rocket" } }
//! { "event": "room:leave" }
//! ```
//!
//! Room-scoped client events carry no room code: a connection is bound to
//! at most one room, and that binding decides where the event goes. Extra
//! fields such as a `roomId` are ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ErrorCode, PlayerId, Ranking, RoomCode, RoomSnapshot, SettingsRequest, TurnEndReason};

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// Everything a client may ask the server to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// Create a room and join it as host.
    #[serde(rename = "room:create")]
    CreateRoom {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        settings: SettingsRequest,
    },

    /// Join an existing room as a new player.
    #[serde(rename = "room:join", rename_all = "camelCase")]
    JoinRoom {
        room_id: String,
        #[serde(default)]
        name: Option<String>,
    },

    /// Reclaim a seat after a dropped connection.
    #[serde(rename = "room:rejoin", rename_all = "camelCase")]
    RejoinRoom { room_id: String, player_name: String },

    /// Host only: remove another player.
    #[serde(rename = "room:kick", rename_all = "camelCase")]
    KickPlayer { target_id: PlayerId },

    #[serde(rename = "room:leave")]
    LeaveRoom,

    /// Host only: destroy the room for everyone.
    #[serde(rename = "room:close")]
    CloseRoom,

    /// Host only, from the lobby, with at least two players.
    #[serde(rename = "game:start")]
    StartGame,

    /// Drawer only, once per turn.
    #[serde(rename = "round:selectWord")]
    SelectWord { word: String },

    /// Drawer only. The stroke is relayed as-is.
    #[serde(rename = "draw:stroke")]
    DrawStroke { stroke: Value },

    /// Drawer only. Flood-fill parameters relayed as-is.
    #[serde(rename = "draw:fill")]
    DrawFill(Value),

    /// Drawer or host.
    #[serde(rename = "draw:clear")]
    ClearCanvas,

    /// A chat line, which may turn out to be a correct guess.
    #[serde(rename = "chat:message")]
    Chat { text: String },

    /// Host only: end the current turn now.
    #[serde(rename = "round:end")]
    EndTurn {
        #[serde(default)]
        reason: Option<TurnEndReason>,
    },

    #[serde(rename = "heartbeat")]
    Heartbeat,
}

impl ClientEvent {
    /// Wire name of the event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => "room:create",
            Self::JoinRoom { .. } => "room:join",
            Self::RejoinRoom { .. } => "room:rejoin",
            Self::KickPlayer { .. } => "room:kick",
            Self::LeaveRoom => "room:leave",
            Self::CloseRoom => "room:close",
            Self::StartGame => "game:start",
            Self::SelectWord { .. } => "round:selectWord",
            Self::DrawStroke { .. } => "draw:stroke",
            Self::DrawFill(_) => "draw:fill",
            Self::ClearCanvas => "draw:clear",
            Self::Chat { .. } => "chat:message",
            Self::EndTurn { .. } => "round:end",
            Self::Heartbeat => "heartbeat",
        }
    }
}

// ---------------------------------------------------------------------------
// Acknowledgements
// ---------------------------------------------------------------------------

/// The answer to one client envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AckOutcome {
    /// The action was applied.
    Ok {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room: Option<JoinedRoom>,
    },
    /// The action was dropped as stale: wrong role or wrong room status.
    /// The next snapshot brings the client back in sync.
    Ignored,
    /// The action failed.
    Error { code: ErrorCode, message: String },
}

impl AckOutcome {
    /// A bare success.
    pub fn ok() -> Self {
        Self::Ok { room: None }
    }
}

/// Returned by create, join and rejoin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedRoom {
    pub room_id: RoomCode,
    pub player_id: PlayerId,
    pub state: RoomSnapshot,
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// A chat line as broadcast to the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub player_id: PlayerId,
    pub name: String,
    pub text: String,
}

/// Everything the server pushes to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// Reply to the client envelope numbered `seq`.
    #[serde(rename = "ack")]
    Ack { seq: u64, outcome: AckOutcome },

    /// Full room snapshot, after every mutation.
    #[serde(rename = "room:state")]
    RoomState(RoomSnapshot),

    /// Sent to the drawer only.
    #[serde(rename = "round:wordOptions")]
    WordOptions { words: Vec<String> },

    /// The drawer picked a word; guessing starts.
    #[serde(rename = "round:start", rename_all = "camelCase")]
    TurnStarted {
        drawer_id: PlayerId,
        ends_at: u64,
        mask: Vec<char>,
    },

    /// A letter was revealed.
    #[serde(rename = "round:maskUpdate", rename_all = "camelCase")]
    MaskUpdate { room_id: RoomCode, mask: Vec<char> },

    #[serde(rename = "draw:stroke")]
    Stroke(Value),

    #[serde(rename = "draw:fill")]
    Fill(Value),

    #[serde(rename = "draw:clear")]
    ClearCanvas,

    /// Strokes of the turn in progress, for a player who just arrived.
    #[serde(rename = "draw:replay")]
    Replay { strokes: Vec<Value> },

    #[serde(rename = "chat:message")]
    Chat(ChatMessage),

    /// Someone guessed the word. The guess text itself is not broadcast.
    #[serde(rename = "guess:correct", rename_all = "camelCase")]
    CorrectGuess { player_id: PlayerId },

    #[serde(rename = "drawer:turnEnd", rename_all = "camelCase")]
    TurnEnded {
        reason: TurnEndReason,
        /// `None` if the drawer never picked a word.
        word: Option<String>,
        drawer_id: PlayerId,
        state: RoomSnapshot,
    },

    #[serde(rename = "round:complete", rename_all = "camelCase")]
    RoundComplete {
        round_number: u32,
        rankings: Vec<Ranking>,
        state: RoomSnapshot,
    },

    #[serde(rename = "game:complete", rename_all = "camelCase")]
    GameComplete {
        final_rankings: Vec<Ranking>,
        state: RoomSnapshot,
    },

    /// One tick of the auto-progress countdown.
    #[serde(rename = "autoProgress:countdown", rename_all = "camelCase")]
    Countdown { countdown: u32, is_round_complete: bool },

    /// Terminal: the room no longer exists.
    #[serde(rename = "room:closed")]
    RoomClosed,

    /// Terminal for the kicked player.
    #[serde(rename = "room:kicked")]
    Kicked,

    #[serde(rename = "heartbeatAck", rename_all = "camelCase")]
    HeartbeatAck { server_time: u64 },
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn decode(value: Value) -> ClientEvent {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_client_create_room_with_partial_settings() {
        let event = decode(json!({
            "event": "room:create",
            "data": { "name": "Ada", "settings": { "maxPlayers": 2 } }
        }));
        match event {
            ClientEvent::CreateRoom { name, settings } => {
                assert_eq!(name.as_deref(), Some("Ada"));
                assert_eq!(settings.max_players, Some(2));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_client_create_room_without_settings() {
        let event = decode(json!({ "event": "room:create", "data": {} }));
        assert_eq!(
            event,
            ClientEvent::CreateRoom {
                name: None,
                settings: SettingsRequest::default()
            }
        );
    }

    #[test]
    fn test_client_rejoin_uses_camel_case_fields() {
        let event = decode(json!({
            "event": "room:rejoin",
            "data": { "roomId": "abcdef", "playerName": "Ada" }
        }));
        assert_eq!(
            event,
            ClientEvent::RejoinRoom {
                room_id: "abcdef".into(),
                player_name: "Ada".into()
            }
        );
    }

    #[test]
    fn test_client_unit_event_without_data() {
        assert_eq!(decode(json!({ "event": "game:start" })), ClientEvent::StartGame);
        assert_eq!(decode(json!({ "event": "room:leave" })), ClientEvent::LeaveRoom);
    }

    #[test]
    fn test_client_extra_room_id_is_ignored() {
        let event = decode(json!({
            "event": "chat:message",
            "data": { "roomId": "ABCDEF", "text": "hello" }
        }));
        assert_eq!(event, ClientEvent::Chat { text: "hello".into() });
    }

    #[test]
    fn test_client_end_turn_reason_optional() {
        assert_eq!(
            decode(json!({ "event": "round:end", "data": {} })),
            ClientEvent::EndTurn { reason: None }
        );
        assert_eq!(
            decode(json!({ "event": "round:end", "data": { "reason": "HOST" } })),
            ClientEvent::EndTurn {
                reason: Some(TurnEndReason::Host)
            }
        );
    }

    #[test]
    fn test_client_stroke_payload_is_opaque() {
        let stroke = json!({ "points": [[1, 2], [3, 4]], "color": "#000", "size": 4 });
        let event = decode(json!({ "event": "draw:stroke", "data": { "stroke": stroke.clone() } }));
        assert_eq!(event, ClientEvent::DrawStroke { stroke });
    }

    #[test]
    fn test_client_event_name_matches_wire_tag() {
        let event = ClientEvent::SelectWord { word: "rocket".into() };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], event.name());
    }

    #[test]
    fn test_ack_ok_json_shape() {
        let event = ServerEvent::Ack {
            seq: 4,
            outcome: AckOutcome::ok(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, json!({ "event": "ack", "data": { "seq": 4, "outcome": { "status": "ok" } } }));
    }

    #[test]
    fn test_ack_error_json_shape() {
        let event = ServerEvent::Ack {
            seq: 9,
            outcome: AckOutcome::Error {
                code: ErrorCode::RoomFull,
                message: "room ABCDEF is full".into(),
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["data"]["outcome"]["status"], "error");
        assert_eq!(json["data"]["outcome"]["code"], "ROOM_FULL");
    }

    #[test]
    fn test_server_countdown_json_shape() {
        let json = serde_json::to_value(ServerEvent::Countdown {
            countdown: 3,
            is_round_complete: false,
        })
        .unwrap();
        assert_eq!(
            json,
            json!({
                "event": "autoProgress:countdown",
                "data": { "countdown": 3, "isRoundComplete": false }
            })
        );
    }

    #[test]
    fn test_server_unit_event_json_shape() {
        let json = serde_json::to_value(ServerEvent::RoomClosed).unwrap();
        assert_eq!(json, json!({ "event": "room:closed" }));
    }

    #[test]
    fn test_server_correct_guess_json_shape() {
        let json = serde_json::to_value(ServerEvent::CorrectGuess { player_id: PlayerId(5) }).unwrap();
        assert_eq!(json, json!({ "event": "guess:correct", "data": { "playerId": 5 } }));
    }
}
