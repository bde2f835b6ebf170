//! Error types for the protocol layer.

/// Errors that can occur in the protocol layer.
///
/// A `ProtocolError` always means the bytes or the command shape were
/// wrong. Unknown sessions are not protocol errors; they are ordinary
/// replies ([`UpdateOutcome::NotFound`](crate::UpdateOutcome::NotFound)).
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing fields, or an
    /// unknown `type` tag.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The command decoded fine but violates a protocol rule, e.g. a
    /// blank creator name.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
