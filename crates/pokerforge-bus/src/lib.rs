//! Named-topic publish/subscribe for Pokerforge.
//!
//! The bus decouples whoever changes state (the session registry) from
//! whoever delivers notifications (the subscriber table). Topics are
//! opened and closed at runtime, typically one pair per live session:
//!
//! ```text
//! open_topic(updated:7) ─┐
//!                        ├─ subscribe(handler) ── publish(event) ──→ handler(&event)
//! open_topic(stopped:7) ─┘
//!                        └─ close_topic(final event) ──→ handler(&final), handlers dropped
//! ```
//!
//! # Key types
//!
//! - [`TopicBus`]: the bus itself, generic over topic key and payload
//! - [`SubscriptionId`]: token returned by `subscribe`, used to unsubscribe
//! - [`BusError`]: subscribing to a topic that isn't open

mod bus;
mod error;

pub use bus::{Handler, SubscriptionId, TopicBus};
pub use error::BusError;
