//! Error types for the bus.

/// Errors that can occur on the topic bus.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    /// The topic was never opened, or has already been closed.
    #[error("topic {0} is not open")]
    UnknownTopic(String),
}
