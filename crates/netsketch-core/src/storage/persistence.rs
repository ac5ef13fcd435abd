//! Versioned persistence of the whole state tree.
//!
//! The document stored under [`STATE_STORAGE_KEY`] looks like
//!
//! ```text
//! { "schemaVersion": 1, "timestamp": <ms since epoch>, "state": { ... } }
//! ```
//!
//! Keyed collections are written as ordered `[key, value]` pairs so that
//! insertion order survives and duplicate keys can be detected on load.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use indexmap::{IndexMap, IndexSet};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::{Storage, StorageError};
use crate::model::{
    CanvasView, Connection, Device, EditorSettings, Layer, PerformanceStats, ProjectInfo, State,
    UiState,
};

/// Version tag written into every persisted document.
pub const SCHEMA_VERSION: u32 = 1;

/// Well-known storage key of the autosaved state.
pub const STATE_STORAGE_KEY: &str = "netsketch-state";

/// Errors raised while encoding or decoding a persisted document.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Invalid document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported schema version {found:?} (expected {expected})", expected = SCHEMA_VERSION)]
    SchemaMismatch { found: Option<u64> },
    #[error("Duplicate key `{key}` in {collection}")]
    DuplicateKey { collection: &'static str, key: String },
}

/// The on-disk envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedDocument {
    pub schema_version: u32,
    pub timestamp: u64,
    pub state: PersistedState,
}

/// [`State`] with keyed collections flattened to ordered entry lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    devices: Vec<(String, Device)>,
    connections: Vec<(String, Connection)>,
    layers: Vec<(String, Layer)>,
    current_layer: String,
    #[serde(default)]
    selection: Vec<String>,
    #[serde(default)]
    canvas: CanvasView,
    #[serde(default)]
    ui: UiState,
    #[serde(default)]
    project: ProjectInfo,
    #[serde(default)]
    config: EditorSettings,
    #[serde(default)]
    performance: PerformanceStats,
}

impl From<&State> for PersistedState {
    fn from(state: &State) -> Self {
        fn entries<T: Clone>(map: &IndexMap<String, T>) -> Vec<(String, T)> {
            map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        }

        Self {
            devices: entries(&state.devices),
            connections: entries(&state.connections),
            layers: entries(&state.layers),
            current_layer: state.current_layer.clone(),
            selection: state.selection.iter().cloned().collect(),
            canvas: state.canvas.clone(),
            ui: state.ui.clone(),
            project: state.project.clone(),
            config: state.config.clone(),
            performance: state.performance.clone(),
        }
    }
}

impl PersistedState {
    /// Rebuild the keyed collections, rejecting duplicate keys.
    pub fn into_state(self) -> Result<State, PersistenceError> {
        Ok(State {
            devices: rebuild("devices", self.devices, |d, id| d.id = id)?,
            connections: rebuild("connections", self.connections, |c, id| c.id = id)?,
            layers: rebuild("layers", self.layers, |l, id| l.id = id)?,
            current_layer: self.current_layer,
            selection: self.selection.into_iter().collect::<IndexSet<_>>(),
            canvas: self.canvas,
            ui: self.ui,
            project: self.project,
            config: self.config,
            performance: self.performance,
        })
    }
}

fn rebuild<T>(
    collection: &'static str,
    entries: Vec<(String, T)>,
    set_id: impl Fn(&mut T, String),
) -> Result<IndexMap<String, T>, PersistenceError> {
    let mut map = IndexMap::with_capacity(entries.len());
    for (key, mut value) in entries {
        if map.contains_key(&key) {
            return Err(PersistenceError::DuplicateKey { collection, key });
        }
        set_id(&mut value, key.clone());
        map.insert(key, value);
    }
    Ok(map)
}

/// Serialize `state` into a versioned document.
pub fn encode_document(state: &State, timestamp: u64) -> Result<String, PersistenceError> {
    let document = PersistedDocument {
        schema_version: SCHEMA_VERSION,
        timestamp,
        state: PersistedState::from(state),
    };
    Ok(serde_json::to_string(&document)?)
}

/// Parse a versioned document. Nothing is applied unless the whole document
/// is valid.
pub fn decode_document(json: &str) -> Result<State, PersistenceError> {
    let raw: Value = serde_json::from_str(json)?;
    let version = raw.get("schemaVersion").and_then(Value::as_u64);
    if version != Some(u64::from(SCHEMA_VERSION)) {
        return Err(PersistenceError::SchemaMismatch { found: version });
    }
    let document: PersistedDocument = serde_json::from_value(raw)?;
    document.state.into_state()
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Best-effort save/load of the state tree under a single key.
#[derive(Clone)]
pub struct PersistenceAdapter {
    storage: Arc<dyn Storage>,
    key: String,
}

impl PersistenceAdapter {
    pub fn new(storage: Arc<dyn Storage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Save `state`, reporting failures through the log. Returns whether the
    /// document was written.
    pub fn save(&self, state: &State) -> bool {
        match self.try_save(state) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to save state under `{}`: {}", self.key, e);
                false
            }
        }
    }

    pub fn try_save(&self, state: &State) -> Result<(), PersistenceError> {
        let json = encode_document(state, now_millis())?;
        self.storage.write(&self.key, &json)?;
        debug!("Saved state under `{}` ({} bytes)", self.key, json.len());
        Ok(())
    }

    /// Load the saved state. Missing, corrupt, or incompatible documents
    /// yield `None`.
    pub fn load(&self) -> Option<State> {
        match self.storage.exists(&self.key) {
            Ok(true) => {}
            Ok(false) => {
                debug!("No saved state under `{}`", self.key);
                return None;
            }
            Err(e) => {
                warn!("Cannot look up saved state under `{}`: {}", self.key, e);
                return None;
            }
        }
        match self.try_load() {
            Ok(state) => Some(state),
            Err(e) => {
                warn!("Discarding saved state under `{}`: {}", self.key, e);
                None
            }
        }
    }

    pub fn try_load(&self) -> Result<State, PersistenceError> {
        let json = self.storage.read(&self.key)?;
        decode_document(&json)
    }

    /// Delete the saved document.
    pub fn clear(&self) -> bool {
        match self.storage.delete(&self.key) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to clear saved state under `{}`: {}", self.key, e);
                false
            }
        }
    }
}
