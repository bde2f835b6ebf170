//! Server configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// LivenessConfig
// ---------------------------------------------------------------------------

/// How the server decides a silent peer is gone.
///
/// Every `ping_interval` the connection task sends a WebSocket ping. Any
/// inbound frame (a pong or a command) counts as a sign of life. A peer
/// that stays silent for longer than `timeout` is disconnected and
/// detached from its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivenessConfig {
    /// Gap between pings.
    pub ping_interval: Duration,

    /// Silence after which the connection is torn down.
    pub timeout: Duration,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(10),
            timeout: Duration::from_secs(30),
        }
    }
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

/// Everything needed to run a [`PokerforgeServer`](crate::PokerforgeServer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    /// Ping/timeout settings for every connection.
    pub liveness: LivenessConfig,

    /// Pushes a connection may have queued before further pushes to it
    /// are dropped.
    pub outbox_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            liveness: LivenessConfig::default(),
            outbox_capacity: 64,
        }
    }
}
