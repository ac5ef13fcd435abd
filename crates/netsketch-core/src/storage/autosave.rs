//! Auto-save functionality for state persistence.
//!
//! Saving is poll-driven: the host calls [`AutoSaveManager::maybe_save`]
//! from its event loop, on the same thread that mutates the state, so a save
//! always sees a complete tree.

use std::time::{Duration, Instant};

use log::debug;

use super::persistence::PersistenceAdapter;
use crate::model::State;

/// Default auto-save interval in seconds.
pub const DEFAULT_AUTOSAVE_INTERVAL_SECS: u64 = 30;

/// Tracks unsaved changes and decides when to persist.
pub struct AutoSaveManager {
    persistence: PersistenceAdapter,
    /// Auto-save interval. `None` disables timed saves.
    interval: Option<Duration>,
    /// Last successful save.
    last_save: Option<Instant>,
    /// Whether the state has unsaved changes.
    dirty: bool,
}

impl AutoSaveManager {
    pub fn new(persistence: PersistenceAdapter, interval: Option<Duration>) -> Self {
        Self {
            persistence,
            interval,
            last_save: None,
            dirty: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.interval.is_some()
    }

    /// Mark the state as having unsaved changes.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn last_save(&self) -> Option<Instant> {
        self.last_save
    }

    /// Whether a timed save is due.
    pub fn should_save(&self) -> bool {
        let Some(interval) = self.interval else {
            return false;
        };
        if !self.dirty {
            return false;
        }
        match self.last_save {
            Some(last) => last.elapsed() >= interval,
            None => true,
        }
    }

    /// Save if dirty and the interval elapsed. Returns true if a save was
    /// performed successfully.
    pub fn maybe_save(&mut self, state: &State) -> bool {
        if !self.should_save() {
            return false;
        }
        debug!("Auto-saving state");
        self.save(state)
    }

    /// Save immediately. Clears the dirty flag on success.
    pub fn save(&mut self, state: &State) -> bool {
        let saved = self.persistence.save(state);
        if saved {
            self.last_save = Some(Instant::now());
            self.dirty = false;
        }
        saved
    }

    /// Load the saved state, resetting the dirty flag when one is found.
    pub fn load(&mut self) -> Option<State> {
        let state = self.persistence.load()?;
        self.dirty = false;
        self.last_save = Some(Instant::now());
        Some(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, STATE_STORAGE_KEY, Storage, StorageError, StorageResult};
    use std::sync::Arc;

    fn manager(interval: Option<Duration>) -> AutoSaveManager {
        let storage = Arc::new(MemoryStorage::new());
        AutoSaveManager::new(PersistenceAdapter::new(storage, STATE_STORAGE_KEY), interval)
    }

    struct ReadOnlyStorage;

    impl Storage for ReadOnlyStorage {
        fn write(&self, _key: &str, _contents: &str) -> StorageResult<()> {
            Err(StorageError::Io("read-only medium".to_string()))
        }
        fn read(&self, key: &str) -> StorageResult<String> {
            Err(StorageError::NotFound(key.to_string()))
        }
        fn delete(&self, _key: &str) -> StorageResult<()> {
            Ok(())
        }
        fn list(&self) -> StorageResult<Vec<String>> {
            Ok(vec![])
        }
        fn exists(&self, _key: &str) -> StorageResult<bool> {
            Ok(false)
        }
    }

    #[test]
    fn test_clean_manager_does_not_save() {
        let mut manager = manager(Some(Duration::ZERO));
        assert!(!manager.is_dirty());
        assert!(!manager.should_save());
        assert!(!manager.maybe_save(&State::default()));
    }

    #[test]
    fn test_dirty_manager_saves_and_clears() {
        let mut manager = manager(Some(Duration::ZERO));
        manager.mark_dirty();
        assert!(manager.should_save());
        assert!(manager.maybe_save(&State::default()));
        assert!(!manager.is_dirty());
        assert!(manager.last_save().is_some());
    }

    #[test]
    fn test_interval_gates_saves() {
        let mut manager = manager(Some(Duration::from_secs(3600)));
        manager.mark_dirty();
        assert!(manager.maybe_save(&State::default()));

        manager.mark_dirty();
        assert!(!manager.should_save());
    }

    #[test]
    fn test_disabled_interval_never_saves() {
        let mut manager = manager(None);
        manager.mark_dirty();
        assert!(!manager.is_enabled());
        assert!(!manager.maybe_save(&State::default()));
        assert!(manager.save(&State::default()));
    }

    #[test]
    fn test_failed_save_keeps_dirty() {
        let adapter = PersistenceAdapter::new(Arc::new(ReadOnlyStorage), STATE_STORAGE_KEY);
        let mut manager = AutoSaveManager::new(adapter, Some(Duration::ZERO));
        manager.mark_dirty();
        assert!(!manager.maybe_save(&State::default()));
        assert!(manager.is_dirty());
    }

    #[test]
    fn test_load_restores_saved_state() {
        let mut manager = manager(None);
        let mut state = State::default();
        state.project.name = "Campus".to_string();
        assert!(manager.save(&state));

        manager.mark_dirty();
        let loaded = manager.load().expect("saved state");
        assert_eq!(loaded.project.name, "Campus");
        assert!(!manager.is_dirty());
    }
}
