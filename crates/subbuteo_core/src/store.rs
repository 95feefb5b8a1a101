//! Persistence contract for match snapshots.
//!
//! The rules core never does IO itself. Hosts hand snapshots to a
//! [`MatchStore`]; a failed save is logged by the caller and leaves the live
//! session untouched. Subscribers get every snapshot saved under their match
//! id, which is how a remote view or a spectator stays in sync.

use std::collections::HashMap;

use crate::error::{GameError, Result};
use crate::snapshot::MatchSnapshot;

/// Handle returned by [`MatchStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Callback invoked with each saved snapshot.
pub type SnapshotCallback = Box<dyn FnMut(&MatchSnapshot) + Send>;

/// Somewhere to keep match snapshots.
pub trait MatchStore {
    /// Persist `snapshot` under its match id and notify subscribers.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot write.
    fn save(&mut self, snapshot: &MatchSnapshot) -> Result<()>;

    /// Fetch the latest snapshot for `match_id`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::MatchNotFound`] if nothing was saved under that id.
    fn load(&self, match_id: &str) -> Result<MatchSnapshot>;

    /// Call `callback` after every future save of `match_id`.
    fn subscribe(&mut self, match_id: &str, callback: SnapshotCallback) -> SubscriptionId;

    /// Stop a subscription. Returns `false` if it was not active.
    fn unsubscribe(&mut self, id: SubscriptionId) -> bool;
}

/// Subscriber bookkeeping shared by store implementations.
#[derive(Default)]
pub struct Subscribers {
    next_id: u64,
    entries: Vec<(SubscriptionId, String, SnapshotCallback)>,
}

impl std::fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscribers")
            .field("count", &self.entries.len())
            .finish()
    }
}

impl Subscribers {
    /// Register a callback for `match_id`.
    pub fn add(&mut self, match_id: &str, callback: SnapshotCallback) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.entries.push((id, match_id.to_string(), callback));
        id
    }

    /// Remove a callback.
    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _, _)| *entry != id);
        before != self.entries.len()
    }

    /// Invoke every callback registered for the snapshot's match.
    pub fn notify(&mut self, snapshot: &MatchSnapshot) {
        for (_, match_id, callback) in &mut self.entries {
            if *match_id == snapshot.match_id {
                callback(snapshot);
            }
        }
    }

    /// Number of active subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no subscriptions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// In-process store, keyed by match id.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshots: HashMap<String, MatchSnapshot>,
    subscribers: Subscribers,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored matches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl MatchStore for MemoryStore {
    fn save(&mut self, snapshot: &MatchSnapshot) -> Result<()> {
        snapshot.validate()?;
        self.snapshots
            .insert(snapshot.match_id.clone(), snapshot.clone());
        self.subscribers.notify(snapshot);
        Ok(())
    }

    fn load(&self, match_id: &str) -> Result<MatchSnapshot> {
        self.snapshots
            .get(match_id)
            .cloned()
            .ok_or_else(|| GameError::MatchNotFound(match_id.to_string()))
    }

    fn subscribe(&mut self, match_id: &str, callback: SnapshotCallback) -> SubscriptionId {
        self.subscribers.add(match_id, callback)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.remove(id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::config::RulesConfig;
    use crate::session::MatchSession;

    fn snapshot(id: &str) -> MatchSnapshot {
        let mut session = MatchSession::new(id, RulesConfig::default());
        session.start_positioning(0).unwrap();
        session.snapshot(0)
    }

    #[test]
    fn test_save_then_load() {
        let mut store = MemoryStore::new();
        let snap = snapshot("a");
        store.save(&snap).unwrap();
        assert_eq!(store.load("a").unwrap(), snap);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_load_missing() {
        let store = MemoryStore::new();
        assert!(matches!(store.load("nope"), Err(GameError::MatchNotFound(id)) if id == "nope"));
    }

    #[test]
    fn test_subscribers_only_see_their_match() {
        let mut store = MemoryStore::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = store.subscribe(
            "a",
            Box::new(move |snap| sink.lock().unwrap().push(snap.match_id.clone())),
        );

        store.save(&snapshot("a")).unwrap();
        store.save(&snapshot("b")).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["a".to_string()]);

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.save(&snapshot("a")).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_snapshot_is_not_stored() {
        let mut store = MemoryStore::new();
        let mut snap = snapshot("a");
        snap.score.away = 3;
        assert!(store.save(&snap).is_err());
        assert!(store.is_empty());
    }
}
