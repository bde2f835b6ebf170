//! Notification fan-out for Pokerforge.
//!
//! The [`SubscriberTable`] tracks which connections observe which session.
//! It listens on the session's bus topics and copies every event into the
//! outbox of each observer:
//!
//! ```text
//! registry ──publish──→ bus ──handler──→ SubscriberTable
//!                                           ├─ try_send → outbox(conn-1) → connection task → socket
//!                                           ├─ try_send → outbox(conn-2) → ...
//!                                           └─ try_send → outbox(conn-N)
//! ```
//!
//! Outboxes are bounded `tokio::sync::mpsc` channels. The table never
//! waits on one: a full or closed outbox loses that one message and is
//! logged, while every other observer still gets it.

mod error;
mod table;

pub use error::FanoutError;
pub use table::{Outbox, SubscriberTable, outbox};
