//! Per-connection state machine.
//!
//! A [`ConnectionLifecycle`] turns decoded commands into replies and keeps
//! track of which session (if any) the connection observes:
//!
//! ```text
//!             ADD ok              own identity deleted / session stopped
//! Connected ─────────→ Subscribed{s} ───────────────────────────────→ Connected
//!     │                    │  ADD ok on s' (detach s, attach s')
//!     │                    └──────────→ Subscribed{s'}
//!     └── close ──→ Closed ←── close ──┘
//! ```
//!
//! It does no I/O: the connection handler decodes frames, calls
//! [`handle`](ConnectionLifecycle::handle), and writes the reply.

use std::sync::Arc;

use pokerforge_fanout::Outbox;
use pokerforge_protocol::{
    ClientMessage, Participant, ProtocolError, ServerMessage, SessionId,
    UpdateAction, UpdateOutcome, error_codes,
};
use pokerforge_transport::ConnectionId;

use crate::Coordinator;

/// Where a connection stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Open, observing nothing.
    Connected,
    /// Observing `session_id`, joined as `identity`.
    Subscribed {
        session_id: SessionId,
        identity: String,
    },
    /// Torn down. Every further command is refused.
    Closed,
}

/// Command handling and subscription bookkeeping for one connection.
///
/// Dropping a lifecycle closes it, so a connection task that exits for
/// any reason never leaves its outbox registered with the table.
pub struct ConnectionLifecycle {
    coordinator: Arc<Coordinator>,
    conn_id: ConnectionId,
    outbox: Outbox,
    state: ConnectionState,
}

impl ConnectionLifecycle {
    /// Creates a lifecycle in the `Connected` state.
    ///
    /// Pushes for a subscribed session are queued on `outbox`.
    pub fn new(
        coordinator: Arc<Coordinator>,
        conn_id: ConnectionId,
        outbox: Outbox,
    ) -> Self {
        Self {
            coordinator,
            conn_id,
            outbox,
            state: ConnectionState::Connected,
        }
    }

    /// The connection this lifecycle belongs to.
    pub fn conn_id(&self) -> ConnectionId {
        self.conn_id
    }

    /// Current state.
    ///
    /// Another connection deleting this one's participant, or the session
    /// stopping, detaches it in the table; the state catches up here.
    pub fn state(&mut self) -> &ConnectionState {
        self.sync();
        &self.state
    }

    /// Runs one command and returns the reply.
    pub fn handle(&mut self, msg: ClientMessage) -> ServerMessage {
        self.sync();
        if self.state == ConnectionState::Closed {
            return ServerMessage::Error {
                code: error_codes::CLOSED,
                message: "connection is closed".into(),
            };
        }

        match msg {
            ClientMessage::StartSession { creator_name } => {
                if creator_name.trim().is_empty() {
                    return self.reject("creator_name must not be blank");
                }
                let session =
                    self.coordinator.registry().start_session(&creator_name);
                ServerMessage::SessionStarted { session }
            }

            ClientMessage::GetSession { session_id } => {
                ServerMessage::SessionSnapshot {
                    session_id,
                    session: self.coordinator.registry().get_session(session_id),
                }
            }

            ClientMessage::UpdateSession {
                session_id,
                action,
                participant,
            } => {
                if participant.identity.trim().is_empty() {
                    return self.reject("participant identity must not be blank");
                }
                let result = match action {
                    UpdateAction::Add => self.join(session_id, &participant),
                    UpdateAction::Delete => self.leave(session_id, &participant),
                };
                ServerMessage::UpdateResult {
                    session_id,
                    result,
                    participant,
                }
            }

            ClientMessage::StopSession { session_id } => {
                ServerMessage::StopResult {
                    session_id,
                    existed: self.coordinator.registry().stop_session(session_id),
                }
            }
        }
    }

    /// The reply for a frame that didn't decode.
    pub fn malformed(&self, err: &ProtocolError) -> ServerMessage {
        tracing::debug!(conn_id = %self.conn_id, error = %err, "malformed command");
        ServerMessage::Error {
            code: error_codes::MALFORMED,
            message: err.to_string(),
        }
    }

    /// Tracks pushes on their way to the peer.
    ///
    /// A `SessionStopped` for the observed session means the table has
    /// already dropped this connection, so the state returns to
    /// `Connected`. Any other push re-checks table membership.
    pub fn observe_push(&mut self, push: &ServerMessage) {
        if let ServerMessage::SessionStopped { session_id } = push {
            if self.subscribed_to() == Some(*session_id) {
                self.state = ConnectionState::Connected;
            }
        }
        self.sync();
    }

    /// Detaches from any session and refuses further commands.
    ///
    /// Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(session_id) = self.subscribed_to() {
            self.coordinator.table().detach(session_id, self.conn_id);
        }
        if self.state != ConnectionState::Closed {
            tracing::debug!(conn_id = %self.conn_id, "connection lifecycle closed");
            self.state = ConnectionState::Closed;
        }
    }

    fn join(&mut self, session_id: SessionId, participant: &Participant) -> UpdateOutcome {
        let registry = self.coordinator.registry();
        if registry
            .update_session(session_id, UpdateAction::Add, participant.clone())
            .is_none()
        {
            return UpdateOutcome::NotFound;
        }

        let table = self.coordinator.table();
        if let Some(previous) = self.subscribed_to() {
            if previous != session_id {
                table.detach(previous, self.conn_id);
            }
        }

        match table.attach(
            session_id,
            self.conn_id,
            &participant.identity,
            self.outbox.clone(),
        ) {
            Ok(()) => {
                self.state = ConnectionState::Subscribed {
                    session_id,
                    identity: participant.identity.clone(),
                };
                UpdateAction::Add.applied()
            }
            Err(e) => {
                tracing::debug!(
                    conn_id = %self.conn_id,
                    %session_id,
                    error = %e,
                    "session stopped before attach"
                );
                self.state = ConnectionState::Connected;
                UpdateOutcome::NotFound
            }
        }
    }

    fn leave(&mut self, session_id: SessionId, participant: &Participant) -> UpdateOutcome {
        let registry = self.coordinator.registry();
        if registry
            .update_session(session_id, UpdateAction::Delete, participant.clone())
            .is_none()
        {
            return UpdateOutcome::NotFound;
        }

        let detached = self
            .coordinator
            .table()
            .detach_participant(session_id, &participant.identity);
        if detached.contains(&self.conn_id) {
            self.state = ConnectionState::Connected;
        }
        UpdateAction::Delete.applied()
    }

    /// Drops a `Subscribed` state the table no longer backs.
    fn sync(&mut self) {
        if let Some(session_id) = self.subscribed_to() {
            if !self.coordinator.table().is_observing(session_id, self.conn_id) {
                tracing::debug!(conn_id = %self.conn_id, %session_id, "no longer observing");
                self.state = ConnectionState::Connected;
            }
        }
    }

    fn subscribed_to(&self) -> Option<SessionId> {
        match &self.state {
            ConnectionState::Subscribed { session_id, .. } => Some(*session_id),
            _ => None,
        }
    }

    fn reject(&self, reason: &str) -> ServerMessage {
        self.malformed(&ProtocolError::InvalidMessage(reason.to_string()))
    }
}

impl Drop for ConnectionLifecycle {
    fn drop(&mut self) {
        self.close();
    }
}
