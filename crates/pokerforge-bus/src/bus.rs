//! The topic bus: a map from topic to registered handlers.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::BusError;

/// A registered callback. Invoked synchronously by the publisher, so it
/// must not block: queue work, don't do it.
pub type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Token identifying one subscription. Returned by
/// [`TopicBus::subscribe`], consumed by [`TopicBus::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

struct BusInner<T, E> {
    /// Open topics and their handlers, in subscription order.
    topics: HashMap<T, Vec<(SubscriptionId, Handler<E>)>>,
    /// Reverse index so `unsubscribe` doesn't scan every topic.
    owners: HashMap<SubscriptionId, T>,
}

/// Publish/subscribe over dynamically opened topics.
///
/// `T` is the topic key (for sessions, one `updated`/`stopped` pair per
/// session id) and `E` the payload type.
///
/// # Delivery
///
/// - `publish` snapshots the topic's handlers under the lock, releases
///   it, then calls each handler. A handler registered after the
///   snapshot misses that publish.
/// - Handlers run outside the lock, so a handler may itself call
///   `subscribe`/`unsubscribe`/`publish` without deadlocking.
/// - Publishes issued one after another by the same caller reach each
///   handler in that order. Callers that need per-topic ordering across
///   threads serialize their publishes (the registry does, per session).
pub struct TopicBus<T, E> {
    inner: Mutex<BusInner<T, E>>,
    next_id: AtomicU64,
}

impl<T, E> TopicBus<T, E>
where
    T: Eq + Hash + Clone + fmt::Display,
{
    /// Creates a bus with no open topics.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BusInner {
                topics: HashMap::new(),
                owners: HashMap::new(),
            }),
            next_id: AtomicU64::new(1),
        }
    }

    /// Opens a topic. Returns `false` if it was already open.
    pub fn open_topic(&self, topic: T) -> bool {
        let mut inner = self.inner.lock();
        if inner.topics.contains_key(&topic) {
            return false;
        }
        tracing::trace!(%topic, "topic opened");
        inner.topics.insert(topic, Vec::new());
        true
    }

    /// Closes a topic, dropping all of its handlers.
    ///
    /// Removal is atomic with respect to `subscribe`: a handler either
    /// was registered before the close (and receives `last`, if given) or
    /// its `subscribe` fails with [`BusError::UnknownTopic`].
    ///
    /// Returns how many handlers were released. Closing a topic that
    /// isn't open is a no-op returning 0.
    pub fn close_topic(&self, topic: &T, last: Option<&E>) -> usize {
        let handlers = {
            let mut inner = self.inner.lock();
            let Some(handlers) = inner.topics.remove(topic) else {
                return 0;
            };
            for (id, _) in &handlers {
                inner.owners.remove(id);
            }
            handlers
        };

        if let Some(payload) = last {
            for (_, handler) in &handlers {
                handler(payload);
            }
        }

        tracing::trace!(%topic, handlers = handlers.len(), "topic closed");
        handlers.len()
    }

    /// Registers `handler` on an open topic.
    ///
    /// # Errors
    /// [`BusError::UnknownTopic`] if the topic is not open.
    pub fn subscribe<F>(
        &self,
        topic: T,
        handler: F,
    ) -> Result<SubscriptionId, BusError>
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock();
        let Some(handlers) = inner.topics.get_mut(&topic) else {
            return Err(BusError::UnknownTopic(topic.to_string()));
        };

        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        handlers.push((id, Arc::new(handler)));
        inner.owners.insert(id, topic);
        Ok(id)
    }

    /// Removes a subscription.
    ///
    /// Idempotent: returns `false` (and does nothing) if the id was
    /// already removed or its topic was closed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.lock();
        let Some(topic) = inner.owners.remove(&id) else {
            return false;
        };
        if let Some(handlers) = inner.topics.get_mut(&topic) {
            handlers.retain(|(sid, _)| *sid != id);
        }
        true
    }

    /// Delivers `payload` to every handler currently on `topic`.
    ///
    /// Returns the number of handlers called; 0 if the topic isn't open.
    pub fn publish(&self, topic: &T, payload: &E) -> usize {
        let handlers: Vec<Handler<E>> = {
            let inner = self.inner.lock();
            match inner.topics.get(topic) {
                Some(handlers) => {
                    handlers.iter().map(|(_, h)| Arc::clone(h)).collect()
                }
                None => {
                    tracing::trace!(%topic, "publish to closed topic");
                    return 0;
                }
            }
        };

        for handler in &handlers {
            handler(payload);
        }
        handlers.len()
    }

    /// Returns `true` if the topic is open.
    pub fn has_topic(&self, topic: &T) -> bool {
        self.inner.lock().topics.contains_key(topic)
    }

    /// Number of open topics.
    pub fn topic_count(&self) -> usize {
        self.inner.lock().topics.len()
    }

    /// Number of handlers on a topic (0 if it isn't open).
    pub fn handler_count(&self, topic: &T) -> usize {
        self.inner
            .lock()
            .topics
            .get(topic)
            .map_or(0, |handlers| handlers.len())
    }
}

impl<T, E> Default for TopicBus<T, E>
where
    T: Eq + Hash + Clone + fmt::Display,
{
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Tests
// =========================================================================
