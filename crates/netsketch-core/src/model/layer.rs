//! Layers group devices for visibility and ordering.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::LayerId;

/// Id of the layer that always exists and can never be removed.
pub const DEFAULT_LAYER_ID: &str = "default";

/// A named grouping of devices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    #[serde(default)]
    pub id: LayerId,
    #[serde(default)]
    pub name: String,
    /// Display sequence; lower values are drawn first.
    #[serde(default)]
    pub order: i32,
    #[serde(default = "visible_by_default")]
    pub visible: bool,
    #[serde(default)]
    pub locked: bool,
    /// Number of devices on this layer. Derived on every commit.
    #[serde(default)]
    pub device_count: usize,
}

fn visible_by_default() -> bool {
    true
}

impl Layer {
    /// Create a layer with a freshly generated id.
    pub fn new(name: impl Into<String>, order: i32) -> Self {
        Self::with_id(generate_id(), name, order)
    }

    pub fn with_id(id: impl Into<LayerId>, name: impl Into<String>, order: i32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            order,
            visible: true,
            locked: false,
            device_count: 0,
        }
    }

    /// The built-in layer every orphaned device falls back to.
    pub fn default_layer() -> Self {
        Self::with_id(DEFAULT_LAYER_ID, "Default", 0)
    }
}

/// Generate a fresh layer id.
pub fn generate_id() -> LayerId {
    format!("layer-{}", Uuid::new_v4())
}

/// Layers every fresh diagram starts with.
pub fn default_layers() -> Vec<Layer> {
    vec![
        Layer::default_layer(),
        Layer::with_id("core", "Core", 1),
        Layer::with_id("distribution", "Distribution", 2),
        Layer::with_id("access", "Access", 3),
    ]
}
