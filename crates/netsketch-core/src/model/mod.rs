//! The state tree and the records it owns.

mod canvas;
mod connection;
mod device;
mod diagram;
mod layer;
mod settings;

pub use canvas::{CanvasView, GRID_SIZE, MAX_ZOOM, MIN_ZOOM, snap_to_grid};
pub use connection::{Connection, ConnectionStatus, DEFAULT_MEDIUM};
pub use device::{Device, DeviceStatus};
pub use diagram::Diagram;
pub use layer::{DEFAULT_LAYER_ID, Layer, default_layers};
pub use settings::{EditorSettings, PerformanceStats, ProjectInfo, UiState};

use indexmap::{IndexMap, IndexSet};
use kurbo::Rect;
use serde::{Deserialize, Serialize};

pub type DeviceId = String;
pub type ConnectionId = String;
pub type LayerId = String;

/// Generate a fresh id for a new device.
pub fn new_device_id() -> DeviceId {
    device::generate_id()
}

/// Generate a fresh id for a new connection.
pub fn new_connection_id() -> ConnectionId {
    connection::generate_id()
}

/// Generate a fresh id for a new layer.
pub fn new_layer_id() -> LayerId {
    layer::generate_id()
}

/// The complete editor state.
///
/// Keyed collections preserve insertion order; device order doubles as the
/// default z-order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    pub devices: IndexMap<DeviceId, Device>,
    pub connections: IndexMap<ConnectionId, Connection>,
    pub layers: IndexMap<LayerId, Layer>,
    pub current_layer: LayerId,
    /// Selected device and connection ids.
    pub selection: IndexSet<String>,
    pub canvas: CanvasView,
    pub ui: UiState,
    pub project: ProjectInfo,
    pub config: EditorSettings,
    pub performance: PerformanceStats,
}

impl Default for State {
    fn default() -> Self {
        let layers = default_layers()
            .into_iter()
            .map(|layer| (layer.id.clone(), layer))
            .collect();

        Self {
            devices: IndexMap::new(),
            connections: IndexMap::new(),
            layers,
            current_layer: DEFAULT_LAYER_ID.to_string(),
            selection: IndexSet::new(),
            canvas: CanvasView::default(),
            ui: UiState::default(),
            project: ProjectInfo::default(),
            config: EditorSettings::default(),
            performance: PerformanceStats::default(),
        }
    }
}

impl State {
    /// Whether `id` names an existing device or connection.
    pub fn contains_entity(&self, id: &str) -> bool {
        self.devices.contains_key(id) || self.connections.contains_key(id)
    }

    /// Selection with ids that no longer exist filtered out.
    pub fn live_selection(&self) -> IndexSet<String> {
        self.selection
            .iter()
            .filter(|id| self.contains_entity(id))
            .cloned()
            .collect()
    }

    /// Connections touching `device`, in insertion order.
    pub fn connections_of<'a>(&'a self, device: &'a str) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.values().filter(move |c| c.references(device))
    }

    /// Devices on `layer`, in insertion order.
    pub fn devices_on<'a>(&'a self, layer: &'a str) -> impl Iterator<Item = &'a Device> + 'a {
        self.devices.values().filter(move |d| d.layer == layer)
    }

    /// Layers sorted by their display order.
    pub fn layers_ordered(&self) -> Vec<&Layer> {
        let mut layers: Vec<&Layer> = self.layers.values().collect();
        layers.sort_by_key(|layer| layer.order);
        layers
    }

    /// Bounding box of all device positions.
    pub fn bounds(&self) -> Option<Rect> {
        let mut result: Option<Rect> = None;
        for device in self.devices.values() {
            let point = device.position();
            result = Some(match result {
                Some(r) => r.union_pt(point),
                None => Rect::from_points(point, point),
            });
        }
        result
    }
}
