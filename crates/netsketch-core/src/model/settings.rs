//! Free-form records with no cross-entity invariants.
//!
//! Each record has a handful of typed fields and a flattened `extra` map so
//! front ends can stash their own settings without a schema change.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::canvas::GRID_SIZE;

/// Transient UI flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UiState {
    /// Active editing mode, e.g. `select`, `connect`, `pan`.
    pub mode: String,
    pub show_labels: bool,
    pub sidebar_open: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            mode: "select".to_string(),
            show_labels: true,
            sidebar_open: true,
            extra: Map::new(),
        }
    }
}

/// Project metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectInfo {
    pub name: String,
    pub description: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for ProjectInfo {
    fn default() -> Self {
        Self {
            name: "Untitled Network".to_string(),
            description: String::new(),
            extra: Map::new(),
        }
    }
}

/// Editor preferences stored with the diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorSettings {
    /// Grid spacing used for snapping.
    pub grid_size: f64,
    /// Device type used when a front end places a device without choosing one.
    pub default_device_type: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            grid_size: GRID_SIZE,
            default_device_type: "router".to_string(),
            extra: Map::new(),
        }
    }
}

/// Live rendering and simulation counters. Never recorded in history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PerformanceStats {
    pub fps: f64,
    pub frame_time_ms: f64,
    pub render_count: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
