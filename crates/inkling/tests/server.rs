//! Integration tests for the Inkling server: real WebSocket clients against
//! a server bound to an ephemeral port.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use inkling::InklingServer;
use inkling::protocol::{
    AckOutcome, ClientEvent, Envelope, ErrorCode, JoinedRoom, RoomSnapshot, RoomStatus,
    ServerEvent, SettingsRequest,
};
use serde_json::json;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

const WAIT: Duration = Duration::from_secs(3);

/// Starts a server on a random port and returns the address.
async fn start_server() -> String {
    let server = InklingServer::builder()
        .bind("127.0.0.1:0")
        .seed(7)
        .build()
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    addr
}

/// A test client that numbers its own envelopes.
struct Client {
    ws: ClientWs,
    seq: u64,
}

impl Client {
    async fn connect(addr: &str) -> Self {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("should connect");
        Self { ws, seq: 0 }
    }

    /// Sends one event and returns its seq.
    async fn send(&mut self, event: ClientEvent) -> u64 {
        self.seq += 1;
        let envelope = Envelope {
            seq: self.seq,
            timestamp: 0,
            payload: event,
        };
        self.send_raw(serde_json::to_string(&envelope).expect("encode"))
            .await;
        self.seq
    }

    async fn send_raw(&mut self, text: String) {
        self.ws
            .send(Message::Text(text.into()))
            .await
            .expect("send");
    }

    async fn next_event(&mut self) -> ServerEvent {
        loop {
            let msg = tokio::time::timeout(WAIT, self.ws.next())
                .await
                .expect("timed out waiting for server")
                .expect("stream ended")
                .expect("recv");
            if let Message::Text(text) = msg {
                let envelope: Envelope<ServerEvent> =
                    serde_json::from_str(text.as_str()).expect("decode");
                return envelope.payload;
            }
        }
    }

    /// Reads until an event matches, skipping the rest.
    async fn wait_for(&mut self, matches: impl Fn(&ServerEvent) -> bool) -> ServerEvent {
        loop {
            let event = self.next_event().await;
            if matches(&event) {
                return event;
            }
        }
    }

    /// Reads until the ack for `seq`.
    async fn ack(&mut self, seq: u64) -> AckOutcome {
        let wanted = seq;
        match self
            .wait_for(|e| matches!(e, ServerEvent::Ack { seq, .. } if *seq == wanted))
            .await
        {
            ServerEvent::Ack { outcome, .. } => outcome,
            _ => unreachable!(),
        }
    }

    async fn request(&mut self, event: ClientEvent) -> AckOutcome {
        let seq = self.send(event).await;
        self.ack(seq).await
    }

    /// Reads until a snapshot satisfies `matches`.
    async fn state_where(&mut self, matches: impl Fn(&RoomSnapshot) -> bool) -> RoomSnapshot {
        match self
            .wait_for(|e| matches!(e, ServerEvent::RoomState(s) if matches(s)))
            .await
        {
            ServerEvent::RoomState(snapshot) => snapshot,
            _ => unreachable!(),
        }
    }
}

fn joined(outcome: AckOutcome) -> JoinedRoom {
    match outcome {
        AckOutcome::Ok { room: Some(room) } => room,
        other => panic!("expected a seat, got {other:?}"),
    }
}

fn error_code(outcome: AckOutcome) -> ErrorCode {
    match outcome {
        AckOutcome::Error { code, .. } => code,
        other => panic!("expected an error, got {other:?}"),
    }
}

fn create(name: &str) -> ClientEvent {
    ClientEvent::CreateRoom {
        name: Some(name.into()),
        settings: SettingsRequest::default(),
    }
}

fn join(room: &JoinedRoom, name: &str) -> ClientEvent {
    ClientEvent::JoinRoom {
        room_id: room.room_id.as_str().to_lowercase(),
        name: Some(name.into()),
    }
}

/// A host and one guest seated in a fresh room.
async fn seated_pair(addr: &str) -> (Client, JoinedRoom, Client, JoinedRoom) {
    let mut host = Client::connect(addr).await;
    let host_seat = joined(host.request(create("Ada")).await);
    let mut guest = Client::connect(addr).await;
    let guest_seat = joined(guest.request(join(&host_seat, "Grace")).await);
    host.state_where(|s| s.players.len() == 2).await;
    (host, host_seat, guest, guest_seat)
}

// =========================================================================
// Seating
// =========================================================================

#[tokio::test]
async fn test_create_room_acks_with_host_seat() {
    let addr = start_server().await;
    let mut client = Client::connect(&addr).await;

    let seat = joined(client.request(create("Ada")).await);

    assert_eq!(seat.state.host_id, seat.player_id);
    assert_eq!(seat.state.status, RoomStatus::Lobby);
    assert_eq!(seat.state.players[0].name, "Ada");
    assert_eq!(seat.room_id.as_str().len(), 6);
}

#[tokio::test]
async fn test_join_room_case_insensitive_code_broadcasts_state() {
    let addr = start_server().await;

    let (_host, host_seat, _guest, guest_seat) = seated_pair(&addr).await;

    assert_eq!(guest_seat.room_id, host_seat.room_id);
    assert_ne!(guest_seat.player_id, host_seat.player_id);
    assert!(guest_seat.state.player_named("Grace").is_some());
}

#[tokio::test]
async fn test_join_full_room_returns_room_full() {
    let addr = start_server().await;
    let mut host = Client::connect(&addr).await;
    let seat = joined(
        host.request(ClientEvent::CreateRoom {
            name: Some("Ada".into()),
            settings: SettingsRequest {
                max_players: Some(2),
                ..SettingsRequest::default()
            },
        })
        .await,
    );
    let mut second = Client::connect(&addr).await;
    joined(second.request(join(&seat, "Grace")).await);

    let mut third = Client::connect(&addr).await;
    let outcome = third.request(join(&seat, "Linus")).await;

    assert_eq!(error_code(outcome), ErrorCode::RoomFull);
    let state = host.state_where(|s| s.players.len() == 2).await;
    assert!(state.player_named("Linus").is_none());
}

#[tokio::test]
async fn test_join_unknown_room_returns_not_found() {
    let addr = start_server().await;
    let mut client = Client::connect(&addr).await;

    let outcome = client
        .request(ClientEvent::JoinRoom {
            room_id: "ZZZZZZ".into(),
            name: None,
        })
        .await;

    assert_eq!(error_code(outcome), ErrorCode::RoomNotFound);
}

#[tokio::test]
async fn test_join_malformed_code_returns_invalid_input() {
    let addr = start_server().await;
    let mut client = Client::connect(&addr).await;

    let outcome = client
        .request(ClientEvent::JoinRoom {
            room_id: "abc".into(),
            name: None,
        })
        .await;

    assert_eq!(error_code(outcome), ErrorCode::InvalidInput);
}

#[tokio::test]
async fn test_create_while_seated_returns_invalid_state() {
    let addr = start_server().await;
    let mut client = Client::connect(&addr).await;
    joined(client.request(create("Ada")).await);

    let outcome = client.request(create("Ada again")).await;

    assert_eq!(error_code(outcome), ErrorCode::InvalidState);
}

// =========================================================================
// Requests outside a room, malformed input, heartbeat
// =========================================================================

#[tokio::test]
async fn test_room_action_without_seat_is_ignored() {
    let addr = start_server().await;
    let mut client = Client::connect(&addr).await;

    let outcome = client
        .request(ClientEvent::Chat {
            text: "hello?".into(),
        })
        .await;

    assert_eq!(outcome, AckOutcome::Ignored);
}

#[tokio::test]
async fn test_unknown_event_acks_invalid_input() {
    let addr = start_server().await;
    let mut client = Client::connect(&addr).await;

    client
        .send_raw(json!({ "seq": 41, "payload": { "event": "voice:join", "data": {} } }).to_string())
        .await;
    let outcome = client.ack(41).await;

    assert_eq!(error_code(outcome), ErrorCode::InvalidInput);
}

#[tokio::test]
async fn test_heartbeat_returns_server_time() {
    let addr = start_server().await;
    let mut client = Client::connect(&addr).await;

    client.send(ClientEvent::Heartbeat).await;
    let event = client
        .wait_for(|e| matches!(e, ServerEvent::HeartbeatAck { .. }))
        .await;

    match event {
        ServerEvent::HeartbeatAck { server_time } => assert!(server_time > 0),
        _ => unreachable!(),
    }
}

// =========================================================================
// Game flow
// =========================================================================

#[tokio::test]
async fn test_start_game_offers_words_to_drawer_only() {
    let addr = start_server().await;
    let (mut host, host_seat, mut guest, guest_seat) = seated_pair(&addr).await;

    assert_eq!(host.request(ClientEvent::StartGame).await, AckOutcome::ok());

    let state = host.state_where(|s| s.current_round.is_some()).await;
    assert_eq!(state.status, RoomStatus::InRound);
    let drawer = state.current_round.map(|t| t.drawer_id).expect("turn");
    let drawer_client = if drawer == host_seat.player_id {
        &mut host
    } else {
        assert_eq!(drawer, guest_seat.player_id);
        &mut guest
    };

    match drawer_client
        .wait_for(|e| matches!(e, ServerEvent::WordOptions { .. }))
        .await
    {
        ServerEvent::WordOptions { words } => assert_eq!(words.len(), 3),
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn test_start_game_by_guest_is_ignored() {
    let addr = start_server().await;
    let (_host, _host_seat, mut guest, _guest_seat) = seated_pair(&addr).await;

    assert_eq!(guest.request(ClientEvent::StartGame).await, AckOutcome::Ignored);
}

#[tokio::test]
async fn test_correct_guess_is_announced_not_echoed() {
    let addr = start_server().await;
    let (mut host, host_seat, mut guest, _guest_seat) = seated_pair(&addr).await;
    host.request(ClientEvent::StartGame).await;
    let state = host.state_where(|s| s.current_round.is_some()).await;
    let host_draws = state.current_round.map(|t| t.drawer_id) == Some(host_seat.player_id);
    let (drawer, guesser) = if host_draws {
        (&mut host, &mut guest)
    } else {
        (&mut guest, &mut host)
    };

    let outcome = drawer
        .request(ClientEvent::SelectWord {
            word: "Rocket".into(),
        })
        .await;
    assert_eq!(outcome, AckOutcome::ok());
    guesser
        .wait_for(|e| matches!(e, ServerEvent::TurnStarted { .. }))
        .await;

    let seq = guesser
        .send(ClientEvent::Chat {
            text: "  rocket ".into(),
        })
        .await;
    let wanted = seq;
    let mut saw_correct = false;
    loop {
        match guesser.next_event().await {
            ServerEvent::Chat(message) => panic!("guess leaked as chat: {message:?}"),
            ServerEvent::CorrectGuess { .. } => saw_correct = true,
            ServerEvent::Ack { seq, outcome } if seq == wanted => {
                assert_eq!(outcome, AckOutcome::ok());
                break;
            }
            _ => {}
        }
    }
    if !saw_correct {
        guesser
            .wait_for(|e| matches!(e, ServerEvent::CorrectGuess { .. }))
            .await;
    }

    match drawer
        .wait_for(|e| matches!(e, ServerEvent::TurnEnded { .. }))
        .await
    {
        ServerEvent::TurnEnded { word, .. } => assert_eq!(word.as_deref(), Some("rocket")),
        _ => unreachable!(),
    }
}

// =========================================================================
// Leaving, kicking, closing, reconnecting
// =========================================================================

#[tokio::test]
async fn test_kick_sends_kicked_and_releases_seat() {
    let addr = start_server().await;
    let (mut host, _host_seat, mut guest, guest_seat) = seated_pair(&addr).await;

    let outcome = host
        .request(ClientEvent::KickPlayer {
            target_id: guest_seat.player_id,
        })
        .await;
    assert_eq!(outcome, AckOutcome::ok());

    guest.wait_for(|e| *e == ServerEvent::Kicked).await;
    host.state_where(|s| s.players.len() == 1).await;
    assert_eq!(
        guest.request(ClientEvent::Chat { text: "hey".into() }).await,
        AckOutcome::Ignored
    );
}

#[tokio::test]
async fn test_host_close_notifies_everyone() {
    let addr = start_server().await;
    let (mut host, host_seat, mut guest, _guest_seat) = seated_pair(&addr).await;

    assert_eq!(host.request(ClientEvent::CloseRoom).await, AckOutcome::ok());

    guest.wait_for(|e| *e == ServerEvent::RoomClosed).await;
    let mut late = Client::connect(&addr).await;
    let outcome = late.request(join(&host_seat, "Linus")).await;
    assert_eq!(error_code(outcome), ErrorCode::RoomNotFound);
}

#[tokio::test]
async fn test_leave_removes_player_and_allows_new_room() {
    let addr = start_server().await;
    let (mut host, _host_seat, mut guest, _guest_seat) = seated_pair(&addr).await;

    assert_eq!(guest.request(ClientEvent::LeaveRoom).await, AckOutcome::ok());
    host.state_where(|s| s.players.len() == 1).await;

    joined(guest.request(create("Grace")).await);
}

#[tokio::test]
async fn test_clean_close_removes_player_immediately() {
    let addr = start_server().await;
    let (mut host, _host_seat, mut guest, guest_seat) = seated_pair(&addr).await;

    guest.ws.close(None).await.expect("close");

    let state = host.state_where(|s| s.players.len() == 1).await;
    assert!(state.player(guest_seat.player_id).is_none());
}

#[tokio::test]
async fn test_dropped_link_keeps_seat_for_rejoin() {
    let addr = start_server().await;
    let (mut host, host_seat, guest, guest_seat) = seated_pair(&addr).await;

    // No close frame: the server sees the stream end.
    drop(guest);
    let state = host
        .state_where(|s| {
            s.player(guest_seat.player_id)
                .is_some_and(|p| !p.connected)
        })
        .await;
    assert_eq!(state.players.len(), 2);

    let mut returning = Client::connect(&addr).await;
    let seat = joined(
        returning
            .request(ClientEvent::RejoinRoom {
                room_id: host_seat.room_id.as_str().to_string(),
                player_name: "Grace".into(),
            })
            .await,
    );

    assert_eq!(seat.player_id, guest_seat.player_id);
    host.state_where(|s| {
        s.player(guest_seat.player_id)
            .is_some_and(|p| p.connected)
    })
    .await;
}

#[tokio::test]
async fn test_rejoin_unknown_name_returns_player_not_found() {
    let addr = start_server().await;
    let (_host, host_seat, _guest, _guest_seat) = seated_pair(&addr).await;

    let mut stranger = Client::connect(&addr).await;
    let outcome = stranger
        .request(ClientEvent::RejoinRoom {
            room_id: host_seat.room_id.as_str().to_string(),
            player_name: "Nobody".into(),
        })
        .await;

    assert_eq!(error_code(outcome), ErrorCode::PlayerNotFound);
}

#[tokio::test]
async fn test_rejoin_elsewhere_strips_old_connection_of_seat() {
    let addr = start_server().await;
    let (mut host, host_seat, mut stale, guest_seat) = seated_pair(&addr).await;

    let mut fresh = Client::connect(&addr).await;
    let seat = joined(
        fresh
            .request(ClientEvent::RejoinRoom {
                room_id: host_seat.room_id.as_str().to_string(),
                player_name: "Grace".into(),
            })
            .await,
    );
    assert_eq!(seat.player_id, guest_seat.player_id);

    assert_eq!(
        stale
            .request(ClientEvent::Chat {
                text: "still here".into(),
            })
            .await,
        AckOutcome::Ignored
    );
    assert_eq!(stale.request(ClientEvent::LeaveRoom).await, AckOutcome::Ignored);

    // The rejoined player still speaks for the seat.
    assert_eq!(
        fresh
            .request(ClientEvent::Chat {
                text: "back again".into(),
            })
            .await,
        AckOutcome::ok()
    );
    match host
        .wait_for(|e| matches!(e, ServerEvent::Chat(_)))
        .await
    {
        ServerEvent::Chat(message) => {
            assert_eq!(message.text, "back again");
            assert_eq!(message.player_id, guest_seat.player_id);
        }
        _ => unreachable!(),
    }
    let state = host.state_where(|s| s.players.len() == 2).await;
    assert!(state.player(guest_seat.player_id).is_some());
}
