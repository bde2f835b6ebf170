//! The subscriber table: session id → observing connections.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use pokerforge_bus::{BusError, SubscriptionId};
use pokerforge_protocol::{ServerMessage, SessionId};
use pokerforge_registry::{SessionBus, SessionEvent, SessionTopic};
use pokerforge_transport::ConnectionId;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::FanoutError;

/// Sending half of a connection's push queue.
pub type Outbox = mpsc::Sender<ServerMessage>;

/// Creates a bounded outbox and the receiver its connection task drains.
pub fn outbox(capacity: usize) -> (Outbox, mpsc::Receiver<ServerMessage>) {
    mpsc::channel(capacity.max(1))
}

/// A connection observing a session, and who it joined as.
struct Member {
    identity: String,
    outbox: Outbox,
}

/// Observers of one session, plus the bus subscriptions feeding them.
struct Observers {
    members: HashMap<ConnectionId, Member>,
    subscriptions: [SubscriptionId; 2],
}

/// Registry of which connections observe which session.
///
/// Shared behind an `Arc`; the bus handlers it installs hold only a
/// `Weak` back-reference, so dropping the last `Arc` does not leak the
/// table through the bus.
///
/// One mutex guards every observer set. Nothing done under it waits:
/// bus subscribe/unsubscribe take the bus lock briefly and `try_send`
/// never blocks.
pub struct SubscriberTable {
    bus: Arc<SessionBus>,
    sessions: Mutex<HashMap<SessionId, Observers>>,
    this: Weak<SubscriberTable>,
}

impl SubscriberTable {
    /// Creates an empty table that listens on `bus`.
    pub fn new(bus: Arc<SessionBus>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            bus,
            sessions: Mutex::new(HashMap::new()),
            this: this.clone(),
        })
    }

    /// Registers `conn_id`, joined as `identity`, as an observer of
    /// `session_id`.
    ///
    /// The first observer of a session subscribes the table to both of
    /// the session's topics before this returns. Attaching a connection
    /// that is already an observer replaces its identity and outbox.
    ///
    /// # Errors
    /// [`FanoutError::SessionNotFound`] if the session's topics are closed.
    /// Nothing is registered in that case.
    pub fn attach(
        &self,
        session_id: SessionId,
        conn_id: ConnectionId,
        identity: &str,
        outbox: Outbox,
    ) -> Result<(), FanoutError> {
        let member = Member {
            identity: identity.to_owned(),
            outbox,
        };
        let mut sessions = self.sessions.lock();

        if let Some(observers) = sessions.get_mut(&session_id) {
            observers.members.insert(conn_id, member);
            tracing::debug!(
                %session_id,
                %conn_id,
                observers = observers.members.len(),
                "observer attached"
            );
            return Ok(());
        }

        let subscriptions = self.subscribe(session_id)?;
        sessions.insert(
            session_id,
            Observers {
                members: HashMap::from([(conn_id, member)]),
                subscriptions,
            },
        );
        tracing::debug!(%session_id, %conn_id, "first observer attached");
        Ok(())
    }

    /// Removes `conn_id` from `session_id`'s observers.
    ///
    /// Returns `false` if it wasn't one. When the last observer leaves,
    /// the table's subscriptions to the session's topics are released.
    pub fn detach(&self, session_id: SessionId, conn_id: ConnectionId) -> bool {
        let mut sessions = self.sessions.lock();
        let Some(observers) = sessions.get_mut(&session_id) else {
            return false;
        };
        if observers.members.remove(&conn_id).is_none() {
            return false;
        }

        tracing::debug!(
            %session_id,
            %conn_id,
            remaining = observers.members.len(),
            "observer detached"
        );

        self.release_if_empty(&mut sessions, session_id);
        true
    }

    /// Removes every observer of `session_id` that joined as `identity`.
    ///
    /// Used when a participant is deleted from the session, whichever
    /// connection issued the delete. Returns the detached connections.
    pub fn detach_participant(
        &self,
        session_id: SessionId,
        identity: &str,
    ) -> Vec<ConnectionId> {
        let mut sessions = self.sessions.lock();
        let Some(observers) = sessions.get_mut(&session_id) else {
            return Vec::new();
        };

        let removed: Vec<ConnectionId> = observers
            .members
            .iter()
            .filter(|(_, member)| member.identity == identity)
            .map(|(conn_id, _)| *conn_id)
            .collect();
        for conn_id in &removed {
            observers.members.remove(conn_id);
            tracing::debug!(%session_id, %conn_id, identity, "deleted participant detached");
        }

        self.release_if_empty(&mut sessions, session_id);
        removed
    }

    /// Whether `conn_id` is currently an observer of `session_id`.
    pub fn is_observing(&self, session_id: SessionId, conn_id: ConnectionId) -> bool {
        self.sessions
            .lock()
            .get(&session_id)
            .is_some_and(|observers| observers.members.contains_key(&conn_id))
    }

    /// Queues `msg` for every observer of `session_id`.
    ///
    /// Returns how many outboxes accepted it. A full or closed outbox is
    /// skipped with a warning; it never affects the other observers.
    pub fn broadcast(&self, session_id: SessionId, msg: &ServerMessage) -> usize {
        let sessions = self.sessions.lock();
        let Some(observers) = sessions.get(&session_id) else {
            return 0;
        };

        observers
            .members
            .iter()
            .filter(|(conn_id, member)| deliver(session_id, **conn_id, &member.outbox, msg))
            .count()
    }

    /// Drops every observer of a stopped session.
    ///
    /// Each removed observer is sent [`ServerMessage::SessionStopped`].
    /// Returns how many observers were removed.
    pub fn on_session_stopped(&self, session_id: SessionId) -> usize {
        let Some(observers) = self.sessions.lock().remove(&session_id) else {
            return 0;
        };
        self.release(&observers);

        let push = ServerMessage::SessionStopped { session_id };
        for (conn_id, member) in &observers.members {
            deliver(session_id, *conn_id, &member.outbox, &push);
        }

        tracing::debug!(
            %session_id,
            observers = observers.members.len(),
            "observers released on stop"
        );
        observers.members.len()
    }

    /// Number of connections observing `session_id`.
    pub fn observer_count(&self, session_id: SessionId) -> usize {
        self.sessions
            .lock()
            .get(&session_id)
            .map_or(0, |observers| observers.members.len())
    }

    /// Number of sessions with at least one observer.
    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Subscribes to both of a session's topics, or neither.
    fn subscribe(
        &self,
        session_id: SessionId,
    ) -> Result<[SubscriptionId; 2], FanoutError> {
        let not_found = |_: BusError| FanoutError::SessionNotFound(session_id);

        let table = self.this.clone();
        let updated = self
            .bus
            .subscribe(SessionTopic::Updated(session_id), move |event: &SessionEvent| {
                if let Some(table) = table.upgrade() {
                    table.broadcast(event.session_id(), &event.to_push());
                }
            })
            .map_err(not_found)?;

        let table = self.this.clone();
        let stopped = self
            .bus
            .subscribe(SessionTopic::Stopped(session_id), move |event: &SessionEvent| {
                if let Some(table) = table.upgrade() {
                    table.on_session_stopped(event.session_id());
                }
            });

        match stopped {
            Ok(stopped) => Ok([updated, stopped]),
            Err(e) => {
                self.bus.unsubscribe(updated);
                Err(not_found(e))
            }
        }
    }

    fn release_if_empty(
        &self,
        sessions: &mut HashMap<SessionId, Observers>,
        session_id: SessionId,
    ) {
        let empty = sessions
            .get(&session_id)
            .is_some_and(|observers| observers.members.is_empty());
        if empty {
            if let Some(observers) = sessions.remove(&session_id) {
                self.release(&observers);
            }
        }
    }

    fn release(&self, observers: &Observers) {
        for id in observers.subscriptions {
            self.bus.unsubscribe(id);
        }
    }
}

/// `try_send` with logging. Returns `true` if the message was queued.
fn deliver(
    session_id: SessionId,
    conn_id: ConnectionId,
    outbox: &Outbox,
    msg: &ServerMessage,
) -> bool {
    match outbox.try_send(msg.clone()) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            tracing::warn!(%session_id, %conn_id, "outbox full, dropping push");
            false
        }
        Err(TrySendError::Closed(_)) => {
            tracing::debug!(%session_id, %conn_id, "outbox closed, dropping push");
            false
        }
    }
}
