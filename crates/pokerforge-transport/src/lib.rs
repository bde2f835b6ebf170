//! Socket plumbing for Pokerforge.
//!
//! The server loop is written against two traits: a [`Transport`] hands
//! out connections, and each [`Connection`] moves frames both ways. Reads
//! and writes on one connection are independent, so a task can sit in
//! [`Connection::recv`] while pushes go out through [`Connection::send`].
//!
//! Liveness is part of the contract: [`Connection::ping`] sends a probe
//! and the peer's answer comes back from `recv` as [`Frame::Pong`].
//!
//! The `websocket` feature (on by default) provides the
//! `tokio-tungstenite` implementation.

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;

/// Process-unique handle for one accepted connection. Shown as `conn-N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wraps a raw id. Transports hand these out; tests build them directly.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw id.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// What [`Connection::recv`] yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// An application payload. Text and binary messages both land here.
    Data(Vec<u8>),
    /// Answer to an earlier [`Connection::ping`].
    Pong,
}

/// A listener producing connections.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Resolves once a peer has connected and finished any upgrade.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;
}

/// One peer.
///
/// Methods take `&self` so the read side and the write side can be
/// driven from different branches of a `select!` (or different tasks).
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Writes one payload frame.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Reads the next frame.
    ///
    /// `Ok(None)` means the peer closed the connection. Control frames
    /// other than pongs are consumed internally and never surface.
    async fn recv(&self) -> Result<Option<Frame>, Self::Error>;

    /// Writes a liveness probe carrying `payload`.
    async fn ping(&self, payload: &[u8]) -> Result<(), Self::Error>;

    /// Starts a graceful close.
    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn test_connection_id_roundtrips_raw_value() {
        assert_eq!(ConnectionId::new(42).into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display_has_conn_prefix() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
    }

    #[test]
    fn test_connection_ids_order_by_raw_value() {
        let ids: BTreeSet<_> = [3, 1, 2].into_iter().map(ConnectionId::new).collect();
        let raw: Vec<u64> = ids.into_iter().map(ConnectionId::into_inner).collect();
        assert_eq!(raw, [1, 2, 3]);
    }

    #[test]
    fn test_frame_pong_differs_from_empty_data() {
        assert_ne!(Frame::Data(Vec::new()), Frame::Pong);
    }
}
