//! Store configuration.

use std::time::Duration;

use crate::history::MAX_HISTORY_SIZE;
use crate::model::DEFAULT_LAYER_ID;
use crate::storage::{DEFAULT_AUTOSAVE_INTERVAL_SECS, STATE_STORAGE_KEY};

/// Settings fixed for the lifetime of a [`StateStore`](crate::StateStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Maximum number of undo/redo snapshots.
    pub max_history_size: usize,
    /// Interval between timed saves. `None` disables auto-save.
    pub auto_save_interval: Option<Duration>,
    /// Storage key of the persisted document.
    pub storage_key: String,
    /// Layer that can never be removed and receives orphaned devices.
    pub default_layer_id: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_history_size: MAX_HISTORY_SIZE,
            auto_save_interval: Some(Duration::from_secs(DEFAULT_AUTOSAVE_INTERVAL_SECS)),
            storage_key: STATE_STORAGE_KEY.to_string(),
            default_layer_id: DEFAULT_LAYER_ID.to_string(),
        }
    }
}

impl StoreConfig {
    pub fn with_max_history_size(mut self, size: usize) -> Self {
        self.max_history_size = size;
        self
    }

    pub fn with_auto_save_interval(mut self, interval: Option<Duration>) -> Self {
        self.auto_save_interval = interval;
        self
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }
}
