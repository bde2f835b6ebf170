//! # Pokerforge
//!
//! Live session server for planning-poker style voting tools.
//!
//! A creator starts a session, participants join and leave, and every
//! connected client observing the session is told about each change as
//! it happens. The pieces:
//!
//! - [`Coordinator`]: the session registry and subscriber table, shared
//!   by every connection
//! - [`ConnectionLifecycle`]: one connection's command handling and
//!   subscription state
//! - [`PokerforgeServer`]: the WebSocket accept loop that drives both
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pokerforge::prelude::*;
//!
//! # async fn run() -> Result<(), PokerforgeError> {
//! let server = PokerforgeServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod coordinator;
mod error;
mod handler;
mod lifecycle;
mod server;

pub use config::{LivenessConfig, ServerConfig};
pub use coordinator::Coordinator;
pub use error::PokerforgeError;
pub use lifecycle::{ConnectionLifecycle, ConnectionState};
pub use server::{PokerforgeServer, PokerforgeServerBuilder};

/// Everything needed to run a server or drive sessions in-process.
pub mod prelude {
    pub use crate::{
        ConnectionLifecycle, ConnectionState, Coordinator, LivenessConfig,
        PokerforgeError, PokerforgeServer, PokerforgeServerBuilder,
        ServerConfig,
    };
    pub use pokerforge_fanout::{Outbox, SubscriberTable, outbox};
    pub use pokerforge_protocol::{
        ClientMessage, Codec, JsonCodec, Participant, ServerMessage,
        Session, SessionId, UpdateAction, UpdateOutcome, error_codes,
    };
    pub use pokerforge_registry::{
        IdSource, RandomIds, SequentialIds, SessionRegistry,
    };
    pub use pokerforge_transport::ConnectionId;
}
