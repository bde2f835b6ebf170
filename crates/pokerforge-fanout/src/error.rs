//! Error types for the fan-out layer.

use pokerforge_protocol::SessionId;

/// Errors returned by [`SubscriberTable`](crate::SubscriberTable).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FanoutError {
    /// The session's topics are closed: it was stopped (or never started).
    #[error("session {0} not found")]
    SessionNotFound(SessionId),
}
