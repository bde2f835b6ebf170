//! Integration tests for the Pokerforge server over real WebSockets.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use pokerforge::prelude::*;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Starts a server on a random port and returns its address and
/// coordinator.
async fn start_server(builder: PokerforgeServerBuilder) -> (String, Arc<Coordinator>) {
    let server = builder
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();
    let coordinator = server.coordinator();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    (addr, coordinator)
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send(ws: &mut ClientWs, msg: &ClientMessage) {
    let bytes = serde_json::to_vec(msg).expect("encode");
    ws.send(Message::Binary(bytes.into())).await.expect("send");
}

/// Next application message, skipping control frames.
async fn recv(ws: &mut ClientWs) -> ServerMessage {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for server")
            .expect("stream ended")
            .expect("ws error");
        match msg {
            Message::Binary(_) | Message::Text(_) => {
                return serde_json::from_slice(&msg.into_data()).expect("decode");
            }
            _ => continue,
        }
    }
}

async fn request(ws: &mut ClientWs, msg: &ClientMessage) -> ServerMessage {
    send(ws, msg).await;
    recv(ws).await
}

async fn start_session(ws: &mut ClientWs, creator: &str) -> Session {
    match request(
        ws,
        &ClientMessage::StartSession {
            creator_name: creator.into(),
        },
    )
    .await
    {
        ServerMessage::SessionStarted { session } => session,
        other => panic!("expected SessionStarted, got {other:?}"),
    }
}

async fn join(ws: &mut ClientWs, session_id: SessionId, identity: &str) -> UpdateOutcome {
    let msg = ClientMessage::UpdateSession {
        session_id,
        action: UpdateAction::Add,
        participant: Participant::new(identity, identity),
    };
    match request(ws, &msg).await {
        ServerMessage::UpdateResult { result, .. } => result,
        other => panic!("expected UpdateResult, got {other:?}"),
    }
}

/// Polls until `check` holds or a second has passed.
async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_start_then_get_session() {
    let (addr, _coord) = start_server(PokerforgeServer::builder()).await;
    let mut ws = connect(&addr).await;

    let session = start_session(&mut ws, "alice").await;
    let reply = request(
        &mut ws,
        &ClientMessage::GetSession {
            session_id: session.id,
        },
    )
    .await;

    assert_eq!(
        reply,
        ServerMessage::SessionSnapshot {
            session_id: session.id,
            session: Some(session),
        }
    );
}

#[tokio::test]
async fn test_update_pushes_to_other_observer() {
    let (addr, _coord) = start_server(PokerforgeServer::builder()).await;
    let mut first = connect(&addr).await;
    let mut second = connect(&addr).await;

    let id = start_session(&mut first, "alice").await.id;
    assert_eq!(join(&mut first, id, "bob").await, UpdateOutcome::Added);
    assert_eq!(join(&mut second, id, "carol").await, UpdateOutcome::Added);

    match recv(&mut first).await {
        ServerMessage::SessionUpdated { session_id, session } => {
            assert_eq!(session_id, id);
            let names: Vec<_> =
                session.participants.iter().map(|p| p.identity.as_str()).collect();
            assert_eq!(names, ["bob", "carol"]);
        }
        other => panic!("expected SessionUpdated, got {other:?}"),
    }
}

#[tokio::test]
async fn test_stop_pushes_session_stopped_to_observers() {
    let (addr, coord) = start_server(PokerforgeServer::builder()).await;
    let mut first = connect(&addr).await;
    let mut second = connect(&addr).await;
    let id = start_session(&mut first, "alice").await.id;
    join(&mut first, id, "bob").await;
    join(&mut second, id, "carol").await;
    let _ = recv(&mut first).await; // carol's join

    let reply = request(&mut second, &ClientMessage::StopSession { session_id: id }).await;
    let reply = match reply {
        ServerMessage::SessionStopped { .. } => recv(&mut second).await,
        other => other,
    };

    assert_eq!(reply, ServerMessage::StopResult { session_id: id, existed: true });
    assert_eq!(recv(&mut first).await, ServerMessage::SessionStopped { session_id: id });
    assert_eq!(coord.table().observer_count(id), 0);
    assert!(coord.registry().get_session(id).is_none());
}

#[tokio::test]
async fn test_host_deleting_participant_detaches_their_connection() {
    let (addr, coord) = start_server(PokerforgeServer::builder()).await;
    let mut host = connect(&addr).await;
    let mut bob = connect(&addr).await;
    let id = start_session(&mut host, "alice").await.id;
    join(&mut host, id, "host").await;
    join(&mut bob, id, "bob").await;
    let _ = recv(&mut host).await; // bob's join

    let reply = request(
        &mut host,
        &ClientMessage::UpdateSession {
            session_id: id,
            action: UpdateAction::Delete,
            participant: Participant::new("bob", "bob"),
        },
    )
    .await;
    // The reply and host's own push may arrive in either order.
    let both = [reply, recv(&mut host).await];
    assert!(both.iter().any(|m| matches!(
        m,
        ServerMessage::UpdateResult { result: UpdateOutcome::Deleted, .. }
    )));
    assert!(matches!(recv(&mut bob).await, ServerMessage::SessionUpdated { .. }));
    assert_eq!(coord.table().observer_count(id), 1);

    join(&mut host, id, "carol").await;
    let _ = recv(&mut host).await; // carol's join
    let quiet = tokio::time::timeout(Duration::from_millis(200), bob.next()).await;
    assert!(quiet.is_err(), "deleted participant got another push");
}

#[tokio::test]
async fn test_malformed_frame_gets_400_and_connection_survives() {
    let (addr, _coord) = start_server(PokerforgeServer::builder()).await;
    let mut ws = connect(&addr).await;

    ws.send(Message::text("{ not json".to_string())).await.unwrap();
    match recv(&mut ws).await {
        ServerMessage::Error { code, .. } => assert_eq!(code, error_codes::MALFORMED),
        other => panic!("expected Error, got {other:?}"),
    }

    let session = start_session(&mut ws, "alice").await;
    assert_eq!(session.creator.display_name, "alice");
}

#[tokio::test]
async fn test_text_frames_are_accepted() {
    let (addr, _coord) = start_server(PokerforgeServer::builder()).await;
    let mut ws = connect(&addr).await;

    let json = r#"{"type":"StopSession","session_id":99}"#;
    ws.send(Message::text(json.to_string())).await.unwrap();

    assert_eq!(
        recv(&mut ws).await,
        ServerMessage::StopResult {
            session_id: SessionId(99),
            existed: false,
        }
    );
}

#[tokio::test]
async fn test_client_close_detaches_observer() {
    let (addr, coord) = start_server(PokerforgeServer::builder()).await;
    let mut ws = connect(&addr).await;
    let id = start_session(&mut ws, "alice").await.id;
    join(&mut ws, id, "bob").await;
    assert_eq!(coord.table().observer_count(id), 1);

    ws.close(None).await.unwrap();

    assert!(eventually(|| coord.table().observer_count(id) == 0).await);
    assert!(
        coord.registry().get_session(id).unwrap().has_participant("bob"),
        "closing a connection does not remove the participant"
    );
}

#[tokio::test]
async fn test_silent_peer_is_dropped_after_liveness_timeout() {
    let builder = PokerforgeServer::builder()
        .liveness(Duration::from_millis(50), Duration::from_millis(200));
    let (addr, coord) = start_server(builder).await;
    let mut ws = connect(&addr).await;
    let id = start_session(&mut ws, "alice").await.id;
    join(&mut ws, id, "bob").await;

    // Never read again: pings go unanswered because the client stream
    // isn't polled, so no pong is sent.
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(eventually(|| coord.table().observer_count(id) == 0).await);
    drop(ws);
}

#[tokio::test]
async fn test_responsive_peer_survives_liveness_timeout() {
    let builder = PokerforgeServer::builder()
        .liveness(Duration::from_millis(50), Duration::from_millis(300));
    let (addr, coord) = start_server(builder).await;
    let mut ws = connect(&addr).await;
    let id = start_session(&mut ws, "alice").await.id;
    join(&mut ws, id, "bob").await;

    // Keep polling the stream so tungstenite answers the server's pings.
    let deadline = tokio::time::Instant::now() + Duration::from_millis(800);
    while tokio::time::Instant::now() < deadline {
        let _ = tokio::time::timeout(Duration::from_millis(20), ws.next()).await;
    }

    assert_eq!(coord.table().observer_count(id), 1);
    let reply = request(&mut ws, &ClientMessage::GetSession { session_id: id }).await;
    assert!(matches!(
        reply,
        ServerMessage::SessionSnapshot { session: Some(_), .. }
    ));
}
