//! The service object every connection shares.

use std::sync::Arc;

use pokerforge_fanout::SubscriberTable;
use pokerforge_registry::{IdSource, SessionBus, SessionRegistry};

/// The session registry and the subscriber table, wired to one bus.
///
/// Built once at startup and handed to each connection task as an
/// `Arc<Coordinator>`. Dropping the last `Arc` drops every live session.
pub struct Coordinator {
    registry: SessionRegistry,
    table: Arc<SubscriberTable>,
}

impl Coordinator {
    /// Creates a coordinator that hands out random session ids.
    pub fn new() -> Self {
        let bus = Arc::new(SessionBus::new());
        let table = SubscriberTable::new(Arc::clone(&bus));
        Self {
            registry: SessionRegistry::new(bus),
            table,
        }
    }

    /// Creates a coordinator that draws session ids from `ids`.
    pub fn with_id_source(ids: impl IdSource) -> Self {
        let bus = Arc::new(SessionBus::new());
        let table = SubscriberTable::new(Arc::clone(&bus));
        Self {
            registry: SessionRegistry::with_id_source(bus, ids),
            table,
        }
    }

    /// The session registry.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// The subscriber table fed by the registry's bus.
    pub fn table(&self) -> &SubscriberTable {
        &self.table
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}
