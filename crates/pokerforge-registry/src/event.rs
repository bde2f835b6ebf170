//! Topics and events the registry publishes.

use std::fmt;

use pokerforge_bus::TopicBus;
use pokerforge_protocol::{ServerMessage, Session, SessionId};

/// The two topics every live session owns on the bus.
///
/// Both are opened when the session starts and closed when it stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionTopic {
    /// Carries [`SessionEvent::Updated`] after each membership change.
    Updated(SessionId),
    /// Carries the single [`SessionEvent::Stopped`] as the topic closes.
    Stopped(SessionId),
}

impl SessionTopic {
    /// The session this topic belongs to.
    pub fn session_id(&self) -> SessionId {
        match self {
            Self::Updated(id) | Self::Stopped(id) => *id,
        }
    }
}

impl fmt::Display for SessionTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Updated(id) => write!(f, "updated:{}", id.0),
            Self::Stopped(id) => write!(f, "stopped:{}", id.0),
        }
    }
}

/// A change to a session, as seen by bus subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The participant set changed; carries the full snapshot.
    Updated(Session),
    /// The session was removed from the registry.
    Stopped(SessionId),
}

impl SessionEvent {
    /// The session this event is about.
    pub fn session_id(&self) -> SessionId {
        match self {
            Self::Updated(session) => session.id,
            Self::Stopped(id) => *id,
        }
    }

    /// The push message observers receive for this event.
    pub fn to_push(&self) -> ServerMessage {
        match self {
            Self::Updated(session) => ServerMessage::SessionUpdated {
                session_id: session.id,
                session: session.clone(),
            },
            Self::Stopped(id) => {
                ServerMessage::SessionStopped { session_id: *id }
            }
        }
    }
}

/// The bus type shared by the registry and the subscriber table.
pub type SessionBus = TopicBus<SessionTopic, SessionEvent>;
