//! Core protocol types for Pokerforge's wire format.
//!
//! Everything in this module travels "on the wire": the session model
//! that clients render, and the commands/events exchanged over a
//! connection.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a live session.
///
/// Newtype over `u64` so a session id can't be mixed up with a connection
/// id or a counter. `#[serde(transparent)]` makes `SessionId(42)` encode
/// as plain `42`.
///
/// Ids are only unique among sessions that are live at the same time; a
/// stopped session's id may be handed out again later.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Session model
// ---------------------------------------------------------------------------

/// Someone taking part in a session.
///
/// Plain value type: two participants are equal when both fields match.
/// Registry operations match on `identity` alone when removing or
/// de-duplicating entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Participant {
    /// Stable identifier chosen by the client (or generated for creators).
    pub identity: String,
    /// Human-readable label shown to other participants.
    pub display_name: String,
}

impl Participant {
    /// Creates a participant from an identity and a display name.
    pub fn new(
        identity: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            identity: identity.into(),
            display_name: display_name.into(),
        }
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.identity)
    }
}

/// A full snapshot of one session.
///
/// The creator is shown as a member by clients but is not required to be
/// in `participants`. `participants` keeps insertion order so snapshots are
/// deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// The session's id, fixed for its whole life.
    pub id: SessionId,
    /// Who opened the session.
    pub creator: Participant,
    /// Everyone currently joined, in join order.
    pub participants: Vec<Participant>,
}

impl Session {
    /// Creates a session with no participants.
    pub fn new(id: SessionId, creator: Participant) -> Self {
        Self {
            id,
            creator,
            participants: Vec::new(),
        }
    }

    /// Returns `true` if a participant with this identity has joined.
    pub fn has_participant(&self, identity: &str) -> bool {
        self.participants.iter().any(|p| p.identity == identity)
    }
}

// ---------------------------------------------------------------------------
// Update actions
// ---------------------------------------------------------------------------

/// What an `UpdateSession` command does to the participant set.
///
/// Encoded in upper case (`"ADD"`, `"DELETE"`) to match the clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateAction {
    /// Join the session (and start observing it).
    Add,
    /// Leave the session.
    Delete,
}

impl UpdateAction {
    /// The outcome reported when this action is applied.
    pub fn applied(self) -> UpdateOutcome {
        match self {
            Self::Add => UpdateOutcome::Added,
            Self::Delete => UpdateOutcome::Deleted,
        }
    }
}

/// The result of an `UpdateSession` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateOutcome {
    Added,
    Deleted,
    /// The session id did not refer to a live session. Nothing changed.
    NotFound,
}

// ---------------------------------------------------------------------------
// ClientMessage: commands
// ---------------------------------------------------------------------------

/// Commands a client sends to the server.
///
/// Internally tagged, so a command looks like
/// `{ "type": "StopSession", "session_id": 3 }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Open a new session with the sender as creator.
    StartSession { creator_name: String },

    /// Fetch a snapshot of a session.
    GetSession { session_id: SessionId },

    /// Add or remove a participant.
    ///
    /// A successful `Add` also subscribes the sending connection to the
    /// session's live updates.
    UpdateSession {
        session_id: SessionId,
        action: UpdateAction,
        participant: Participant,
    },

    /// Tear a session down. Every observer receives `SessionStopped`.
    StopSession { session_id: SessionId },
}

// ---------------------------------------------------------------------------
// ServerMessage: replies and pushes
// ---------------------------------------------------------------------------

/// HTTP-style codes carried by [`ServerMessage::Error`].
pub mod error_codes {
    /// The frame could not be decoded or failed validation.
    pub const MALFORMED: u16 = 400;
    /// The connection is already closed.
    pub const CLOSED: u16 = 410;
}

/// Messages the server sends to a client.
///
/// The first four are replies to a [`ClientMessage`]; `SessionUpdated`
/// and `SessionStopped` are pushed to observers whenever the session
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Reply to `StartSession`.
    SessionStarted { session: Session },

    /// Reply to `GetSession`. `session` is `None` when the id is unknown.
    SessionSnapshot {
        session_id: SessionId,
        session: Option<Session>,
    },

    /// Reply to `UpdateSession`.
    UpdateResult {
        session_id: SessionId,
        result: UpdateOutcome,
        participant: Participant,
    },

    /// Reply to `StopSession`. `existed` is `false` for unknown ids.
    StopResult { session_id: SessionId, existed: bool },

    /// Push: the session's participant set changed.
    SessionUpdated {
        session_id: SessionId,
        session: Session,
    },

    /// Push: the session was stopped. No further pushes follow for it.
    SessionStopped { session_id: SessionId },

    /// The command was rejected. See [`error_codes`].
    Error { code: u16, message: String },
}

// =========================================================================
// Tests
// =========================================================================
