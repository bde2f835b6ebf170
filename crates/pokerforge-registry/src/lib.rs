//! Session registry for Pokerforge.
//!
//! This crate owns the authoritative set of live sessions:
//!
//! 1. **Id allocation**: fresh ids from an [`IdSource`], inserted only if
//!    vacant so two live sessions never share an id
//! 2. **Membership**: atomic add/remove of participants
//!    ([`SessionRegistry::update_session`])
//! 3. **Change events**: every committed change is published on the
//!    session's topics ([`SessionTopic`], [`SessionEvent`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Connection lifecycle (above)  ← issues start/get/update/stop
//!     ↕
//! Registry (this crate)  ← mutates sessions, publishes events
//!     ↕
//! Topic bus (beside)  ← carries events to the subscriber table
//! ```

mod event;
mod ids;
mod registry;

pub use event::{SessionBus, SessionEvent, SessionTopic};
pub use ids::{IdSource, RandomIds, SequentialIds, generate_token};
pub use registry::SessionRegistry;
