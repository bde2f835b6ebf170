//! The session registry: every live session, keyed by id.
//!
//! # Concurrency
//!
//! The map itself sits behind a `RwLock` and each session behind its own
//! `Mutex`:
//!
//! - `get_session`/`update_session` take the map read lock only long
//!   enough to clone the session's `Arc`, then work under the session
//!   lock. Updates to different sessions never contend.
//! - `start_session`/`stop_session` take the map write lock. Stop also
//!   takes the session lock and marks the slot dead, so an update that
//!   grabbed the slot before the removal either commits first or sees a
//!   dead slot and reports not-found.
//! - Change events are published while the session lock is held. Bus
//!   handlers only queue messages, so no I/O happens under the lock, and
//!   a committed update is always published before the stop event.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use pokerforge_protocol::{Participant, Session, SessionId, UpdateAction};

use crate::{
    IdSource, RandomIds, SessionBus, SessionEvent, SessionTopic,
    generate_token,
};

/// One live session plus its liveness flag.
struct Slot {
    session: Session,
    /// Cleared by `stop_session` under the slot lock.
    live: bool,
}

type SharedSlot = Arc<Mutex<Slot>>;

/// The authoritative store of live sessions.
///
/// Constructed once at startup and shared (behind `Arc`) by every
/// connection. Unknown ids are never errors: lookups return `None` and
/// `stop_session` returns `false`.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SharedSlot>>,
    ids: Mutex<Box<dyn IdSource>>,
    bus: Arc<SessionBus>,
}

impl SessionRegistry {
    /// Creates an empty registry publishing on `bus`, with random ids.
    pub fn new(bus: Arc<SessionBus>) -> Self {
        Self::with_id_source(bus, RandomIds)
    }

    /// Creates an empty registry that draws ids from `ids`.
    pub fn with_id_source(bus: Arc<SessionBus>, ids: impl IdSource) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ids: Mutex::new(Box::new(ids)),
            bus,
        }
    }

    /// The bus this registry publishes session events on.
    pub fn bus(&self) -> &Arc<SessionBus> {
        &self.bus
    }

    /// Starts a session owned by `creator_name`.
    ///
    /// The creator gets a freshly generated identity. The new session has
    /// no participants and its two topics are open before this returns.
    ///
    /// Candidate ids are inserted only if vacant; a collision with a live
    /// session draws another id.
    pub fn start_session(&self, creator_name: &str) -> Session {
        let creator = Participant::new(generate_token(), creator_name);
        let mut collisions = 0u32;

        loop {
            let id = self.ids.lock().next_id();
            let mut sessions = self.sessions.write();

            match sessions.entry(id) {
                Entry::Occupied(_) => {
                    collisions += 1;
                    tracing::debug!(
                        session_id = %id,
                        collisions,
                        "session id already live, drawing another"
                    );
                }
                Entry::Vacant(vacant) => {
                    let session = Session::new(id, creator);
                    for topic in
                        [SessionTopic::Updated(id), SessionTopic::Stopped(id)]
                    {
                        if !self.bus.open_topic(topic) {
                            tracing::warn!(%topic, "topic was already open");
                        }
                    }
                    vacant.insert(Arc::new(Mutex::new(Slot {
                        session: session.clone(),
                        live: true,
                    })));

                    tracing::info!(
                        session_id = %id,
                        creator = %creator_name,
                        "session started"
                    );
                    return session;
                }
            }
        }
    }

    /// Returns a snapshot of the session, or `None` if it isn't live.
    pub fn get_session(&self, id: SessionId) -> Option<Session> {
        let slot = self.slot(id)?;
        let slot = slot.lock();
        slot.live.then(|| slot.session.clone())
    }

    /// Adds or removes a participant.
    ///
    /// - `Add` drops any entry with the same identity, then appends, so an
    ///   identity appears at most once (re-adding updates the display
    ///   name and moves the entry to the end).
    /// - `Delete` drops every entry with that identity. Deleting someone
    ///   who isn't there still counts as applied.
    ///
    /// On success the new snapshot is published on
    /// [`SessionTopic::Updated`] and returned. Returns `None`, changing
    /// nothing, if the session isn't live.
    pub fn update_session(
        &self,
        id: SessionId,
        action: UpdateAction,
        participant: Participant,
    ) -> Option<Session> {
        let Some(slot) = self.slot(id) else {
            tracing::debug!(session_id = %id, ?action, "update for unknown session");
            return None;
        };
        let mut slot = slot.lock();
        if !slot.live {
            tracing::debug!(session_id = %id, ?action, "update raced with stop");
            return None;
        }

        let participants = &mut slot.session.participants;
        participants.retain(|p| p.identity != participant.identity);
        if action == UpdateAction::Add {
            participants.push(participant.clone());
        }

        let snapshot = slot.session.clone();
        let observers = self.bus.publish(
            &SessionTopic::Updated(id),
            &SessionEvent::Updated(snapshot.clone()),
        );

        tracing::info!(
            session_id = %id,
            ?action,
            %participant,
            participants = snapshot.participants.len(),
            observers,
            "session updated"
        );
        Some(snapshot)
    }

    /// Stops a session.
    ///
    /// Returns `true` if it was live. Once this returns, `get_session`
    /// and `update_session` report not-found for the id, its topics are
    /// closed, and every handler on [`SessionTopic::Stopped`] has been
    /// given [`SessionEvent::Stopped`].
    pub fn stop_session(&self, id: SessionId) -> bool {
        let mut sessions = self.sessions.write();
        let Some(slot) = sessions.remove(&id) else {
            tracing::debug!(session_id = %id, "stop for unknown session");
            return false;
        };

        let mut slot = slot.lock();
        slot.live = false;
        self.bus.close_topic(&SessionTopic::Updated(id), None);
        let observers = self.bus.close_topic(
            &SessionTopic::Stopped(id),
            Some(&SessionEvent::Stopped(id)),
        );

        tracing::info!(session_id = %id, observers, "session stopped");
        true
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Returns `true` if no session is live.
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Ids of all live sessions, ascending.
    pub fn session_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> =
            self.sessions.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn slot(&self, id: SessionId) -> Option<SharedSlot> {
        self.sessions.read().get(&id).cloned()
    }
}

// =========================================================================
// Tests
// =========================================================================
