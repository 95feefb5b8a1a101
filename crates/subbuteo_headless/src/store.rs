//! File-backed match store.
//!
//! Each match is kept as `<match_id>.ron` inside one directory, so saved
//! matches can be read and edited by hand and checked with the tools crate.

use std::path::{Path, PathBuf};

use subbuteo_core::error::{GameError, Result};
use subbuteo_core::snapshot::MatchSnapshot;
use subbuteo_core::store::{MatchStore, SnapshotCallback, Subscribers, SubscriptionId};

/// Extension of stored snapshot files.
pub const SNAPSHOT_EXTENSION: &str = "ron";

/// Stores snapshots as RON files in a directory.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    subscribers: Subscribers,
}

impl FileStore {
    /// Store rooted at `root`. The directory is created on first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            subscribers: Subscribers::default(),
        }
    }

    /// Directory holding the snapshot files.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ids of every stored match, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be listed.
    pub fn match_ids(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SNAPSHOT_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn path_for(&self, match_id: &str) -> Result<PathBuf> {
        let valid = !match_id.is_empty()
            && match_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
        if !valid {
            return Err(GameError::InvalidState(format!(
                "match id '{match_id}' is not usable as a file name"
            )));
        }
        Ok(self.root.join(format!("{match_id}.{SNAPSHOT_EXTENSION}")))
    }
}

impl MatchStore for FileStore {
    fn save(&mut self, snapshot: &MatchSnapshot) -> Result<()> {
        snapshot.validate()?;
        let path = self.path_for(&snapshot.match_id)?;
        let text = snapshot.to_ron()?;
        std::fs::create_dir_all(&self.root)?;
        std::fs::write(&path, text)?;
        tracing::debug!(match_id = %snapshot.match_id, path = %path.display(), "Snapshot saved");
        self.subscribers.notify(snapshot);
        Ok(())
    }

    fn load(&self, match_id: &str) -> Result<MatchSnapshot> {
        let path = self.path_for(match_id)?;
        if !path.exists() {
            return Err(GameError::MatchNotFound(match_id.to_string()));
        }
        let text = std::fs::read_to_string(&path)?;
        MatchSnapshot::from_ron(&text, &path.display().to_string())
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

    use subbuteo_core::config::RulesConfig;
    use subbuteo_core::session::MatchSession;

    use super::*;

    fn snapshot(id: &str) -> MatchSnapshot {
        MatchSession::new(id, RulesConfig::default()).snapshot(0)
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("matches"));
        let snap = snapshot("final-1");
        store.save(&snap).unwrap();

        assert_eq!(store.load("final-1").unwrap(), snap);
        assert_eq!(store.match_ids().unwrap(), vec!["final-1".to_string()]);
    }

    #[test]
    fn test_missing_match() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(matches!(
            store.load("nobody"),
            Err(GameError::MatchNotFound(id)) if id == "nobody"
        ));
        assert!(store.match_ids().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_path_like_ids() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path());
        assert!(store.save(&snapshot("../escape")).is_err());
        assert!(store.load("a/b").is_err());
    }

    #[test]
    fn test_invalid_snapshot_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path());
        let mut snap = snapshot("broken");
        snap.score.home = 3;
        assert!(store.save(&snap).is_err());
        assert!(matches!(
            store.load("broken"),
            Err(GameError::MatchNotFound(_))
        ));
    }

    #[test]
    fn test_subscribers_see_saves() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = store.subscribe(
            "watched",
            Box::new(move |snap| sink.lock().unwrap().push(snap.match_id.clone())),
        );

        store.save(&snapshot("watched")).unwrap();
        store.save(&snapshot("other")).unwrap();
        assert!(store.unsubscribe(id));
        store.save(&snapshot("watched")).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["watched".to_string()]);
    }
}
