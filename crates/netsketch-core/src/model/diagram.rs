//! Portable diagram format used for file import and export.

use serde::{Deserialize, Serialize};

use super::{Connection, Device, Layer, State};

/// The graph part of a state tree, without view or UI settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagram {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub devices: Vec<Device>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub layers: Vec<Layer>,
}

impl Diagram {
    /// Extract the graph from a state tree, in insertion order.
    pub fn from_state(state: &State) -> Self {
        Self {
            name: Some(state.project.name.clone()),
            devices: state.devices.values().cloned().collect(),
            connections: state.connections.values().cloned().collect(),
            layers: state.layers.values().cloned().collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
