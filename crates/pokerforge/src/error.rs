//! Unified error type for the Pokerforge server.

use pokerforge_protocol::ProtocolError;
use pokerforge_transport::TransportError;

/// Everything that can end a connection task or the accept loop.
///
/// Only the transport edge (accept loop, connection tasks) returns
/// errors; session operations report "not found" as plain values.
#[derive(Debug, thiserror::Error)]
pub enum PokerforgeError {
    /// A transport-level error (bind, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encoding a reply).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_converts_and_keeps_message() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "peer gone");
        let err: PokerforgeError = TransportError::Write(io).into();
        assert!(matches!(err, PokerforgeError::Transport(_)));
        assert_eq!(err.to_string(), "write failed: peer gone");
    }

    #[test]
    fn test_protocol_error_converts_with_question_mark() {
        fn encode() -> Result<(), PokerforgeError> {
            let failed: Result<(), ProtocolError> =
                Err(ProtocolError::InvalidMessage("bad".into()));
            failed?;
            Ok(())
        }
        assert!(matches!(encode(), Err(PokerforgeError::Protocol(_))));
    }
}
