use std::io;
use std::net::SocketAddr;

/// Failure of a socket-level operation.
///
/// Every variant ends the connection (or, for `Listen`, the accept
/// attempt); none is retryable on the same socket.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the listener or accepting a TCP stream failed.
    #[error("listener error: {0}")]
    Listen(#[source] io::Error),

    /// The TCP stream connected but the WebSocket upgrade did not complete.
    #[error("websocket upgrade from {peer} failed: {reason}")]
    Upgrade { peer: SocketAddr, reason: String },

    /// A data, ping, or close frame could not be written.
    #[error("write failed: {0}")]
    Write(#[source] io::Error),

    /// The socket failed while reading.
    #[error("read failed: {0}")]
    Read(#[source] io::Error),
}
