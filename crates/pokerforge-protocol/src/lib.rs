//! Wire protocol for Pokerforge.
//!
//! This crate defines what clients and the server exchange:
//!
//! - **Types** ([`Session`], [`Participant`], [`ClientMessage`],
//!   [`ServerMessage`]): the session model and the command/event shapes.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those messages are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the session
//! core (registry, bus, fan-out). It doesn't know about connections or
//! locks: it only describes messages.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientMessage) → Coordinator (sessions)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientMessage, Participant, ServerMessage, Session, SessionId,
    UpdateAction, UpdateOutcome, error_codes,
};
