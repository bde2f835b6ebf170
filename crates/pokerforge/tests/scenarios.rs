//! End-to-end session scenarios driven through `ConnectionLifecycle`,
//! without a socket in between.

use std::sync::Arc;

use pokerforge::prelude::*;
use tokio::sync::mpsc::Receiver;

struct Client {
    lifecycle: ConnectionLifecycle,
    pushes: Receiver<ServerMessage>,
}

impl Client {
    fn connect(coordinator: &Arc<Coordinator>, n: u64) -> Self {
        let (tx, pushes) = outbox(16);
        Self {
            lifecycle: ConnectionLifecycle::new(
                Arc::clone(coordinator),
                ConnectionId::new(n),
                tx,
            ),
            pushes,
        }
    }

    fn send(&mut self, msg: ClientMessage) -> ServerMessage {
        self.lifecycle.handle(msg)
    }

    fn start(&mut self, creator: &str) -> Session {
        match self.send(ClientMessage::StartSession {
            creator_name: creator.into(),
        }) {
            ServerMessage::SessionStarted { session } => session,
            other => panic!("expected SessionStarted, got {other:?}"),
        }
    }

    fn add(&mut self, session_id: SessionId, p: Participant) -> UpdateOutcome {
        match self.send(ClientMessage::UpdateSession {
            session_id,
            action: UpdateAction::Add,
            participant: p,
        }) {
            ServerMessage::UpdateResult { result, .. } => result,
            other => panic!("expected UpdateResult, got {other:?}"),
        }
    }

    fn drain(&mut self) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = self.pushes.try_recv() {
            out.push(msg);
        }
        out
    }
}

fn coordinator() -> Arc<Coordinator> {
    Arc::new(Coordinator::new())
}

#[tokio::test]
async fn test_scenario_start_add_get() {
    let coord = coordinator();
    let mut alice = Client::connect(&coord, 1);

    let session = alice.start("alice");
    assert_eq!(session.creator.display_name, "alice");
    assert!(!session.creator.identity.is_empty());
    assert!(session.participants.is_empty());

    let bob = Participant::new("bob-id", "bob");
    assert_eq!(alice.add(session.id, bob.clone()), UpdateOutcome::Added);

    match alice.send(ClientMessage::GetSession {
        session_id: session.id,
    }) {
        ServerMessage::SessionSnapshot {
            session: Some(snapshot),
            ..
        } => assert_eq!(snapshot.participants, vec![bob]),
        other => panic!("expected snapshot, got {other:?}"),
    }
}

#[tokio::test]
async fn test_scenario_stop_unknown_session() {
    let coord = coordinator();
    let mut client = Client::connect(&coord, 1);

    let reply = client.send(ClientMessage::StopSession {
        session_id: SessionId(123_456),
    });

    assert_eq!(
        reply,
        ServerMessage::StopResult {
            session_id: SessionId(123_456),
            existed: false,
        }
    );
}

#[tokio::test]
async fn test_scenario_update_pushed_once_to_each_observer() {
    let coord = coordinator();
    let mut a = Client::connect(&coord, 1);
    let mut b = Client::connect(&coord, 2);
    let mut host = Client::connect(&coord, 3);

    let id = host.start("host").id;
    a.add(id, Participant::new("a", "ann"));
    b.add(id, Participant::new("b", "ben"));
    a.drain();
    b.drain();

    host.send(ClientMessage::UpdateSession {
        session_id: id,
        action: UpdateAction::Add,
        participant: Participant::new("p", "pat"),
    });

    let seen_a = a.drain();
    let seen_b = b.drain();
    assert_eq!(seen_a.len(), 1);
    assert_eq!(seen_a, seen_b);
    match &seen_a[0] {
        ServerMessage::SessionUpdated { session, .. } => {
            assert!(session.has_participant("p"));
        }
        other => panic!("expected SessionUpdated, got {other:?}"),
    }
    assert!(host.drain().is_empty(), "host never joined");
}

#[tokio::test]
async fn test_scenario_stop_notifies_each_observer_once() {
    let coord = coordinator();
    let mut a = Client::connect(&coord, 1);
    let mut b = Client::connect(&coord, 2);
    let id = a.start("ann").id;
    a.add(id, Participant::new("a", "ann"));
    b.add(id, Participant::new("b", "ben"));
    a.drain();
    b.drain();

    let reply = a.send(ClientMessage::StopSession { session_id: id });

    assert_eq!(
        reply,
        ServerMessage::StopResult {
            session_id: id,
            existed: true,
        }
    );
    let stopped = ServerMessage::SessionStopped { session_id: id };
    assert_eq!(a.drain(), vec![stopped.clone()]);
    assert_eq!(b.drain(), vec![stopped]);
    assert_eq!(coord.table().observer_count(id), 0);
    assert_eq!(coord.table().broadcast(id, &ServerMessage::SessionStopped { session_id: id }), 0);
}

#[tokio::test]
async fn test_closed_observer_no_longer_receives() {
    let coord = coordinator();
    let mut clients: Vec<Client> =
        (1..=3).map(|n| Client::connect(&coord, n)).collect();
    let id = clients[0].start("ann").id;
    for (i, c) in clients.iter_mut().enumerate() {
        c.add(id, Participant::new(format!("p{i}"), "p"));
        c.drain();
    }
    assert_eq!(coord.table().observer_count(id), 3);

    clients[0].lifecycle.close();
    let queued = coord
        .table()
        .broadcast(id, &ServerMessage::SessionStopped { session_id: id });

    assert_eq!(queued, 2);
}

#[tokio::test]
async fn test_add_after_stop_reports_not_found() {
    let coord = coordinator();
    let mut client = Client::connect(&coord, 1);
    let id = client.start("ann").id;
    client.send(ClientMessage::StopSession { session_id: id });

    let result = client.add(id, Participant::new("b", "ben"));

    assert_eq!(result, UpdateOutcome::NotFound);
    assert_eq!(client.lifecycle.state(), &ConnectionState::Connected);
}
