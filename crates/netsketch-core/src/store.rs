//! The state store: a single owner of the diagram state.
//!
//! Every mutation goes through one commit path:
//!
//! 1. build the candidate tree (patch merge or typed edit),
//! 2. repair referential integrity,
//! 3. stop if nothing changed,
//! 4. install the tree and notify subscribers of changed paths,
//! 5. for significant changes, record the previous tree in history and mark
//!    the state unsaved.
//!
//! Undo and redo swap whole snapshots in and still notify.

use std::sync::Arc;

use indexmap::IndexSet;
use kurbo::{Point, Vec2};
use log::{debug, error, info, warn};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::change;
use crate::config::StoreConfig;
use crate::history::HistoryManager;
use crate::integrity;
use crate::merge;
use crate::model::{
    Connection, ConnectionId, Device, DeviceId, Diagram, Layer, LayerId, State, new_connection_id,
    new_device_id, new_layer_id, snap_to_grid,
};
use crate::storage::{AutoSaveManager, MemoryStorage, PersistenceAdapter, Storage};
use crate::subscription::{SubscribeOptions, Subscription, SubscriptionRegistry};

/// Owner of the live state tree, its history, subscribers and persistence.
///
/// The store is single-threaded; listeners are shared through `Rc`, so it is
/// neither `Send` nor `Sync`.
pub struct StateStore {
    state: State,
    /// JSON view of `state`, used for path lookups and change detection.
    tree: Value,
    config: StoreConfig,
    history: HistoryManager<State>,
    subscriptions: SubscriptionRegistry,
    autosave: AutoSaveManager,
}

impl StateStore {
    /// Create a store with a fresh default state.
    pub fn new(config: StoreConfig, storage: Arc<dyn Storage>) -> Self {
        let autosave = Self::autosave_for(&config, storage);
        Self::assemble(config, autosave, State::default())
    }

    /// Create a store seeded with the persisted state, falling back to
    /// defaults when nothing usable is stored.
    pub fn restore(config: StoreConfig, storage: Arc<dyn Storage>) -> Self {
        let mut autosave = Self::autosave_for(&config, storage);
        let state = match autosave.load() {
            Some(state) => {
                info!(
                    "Restored state with {} devices and {} connections",
                    state.devices.len(),
                    state.connections.len()
                );
                state
            }
            None => State::default(),
        };
        Self::assemble(config, autosave, state)
    }

    /// Create a store around an explicit initial state.
    pub fn with_state(config: StoreConfig, storage: Arc<dyn Storage>, state: State) -> Self {
        let autosave = Self::autosave_for(&config, storage);
        Self::assemble(config, autosave, state)
    }

    /// A store backed by in-memory storage with default configuration.
    pub fn in_memory() -> Self {
        Self::new(StoreConfig::default(), Arc::new(MemoryStorage::new()))
    }

    fn autosave_for(config: &StoreConfig, storage: Arc<dyn Storage>) -> AutoSaveManager {
        let persistence = PersistenceAdapter::new(storage, config.storage_key.clone());
        AutoSaveManager::new(persistence, config.auto_save_interval)
    }

    fn assemble(config: StoreConfig, autosave: AutoSaveManager, mut state: State) -> Self {
        integrity::enforce(&mut state, &State::default(), &config.default_layer_id);
        let tree = to_tree(&state);
        Self {
            state,
            tree,
            history: HistoryManager::new(config.max_history_size),
            subscriptions: SubscriptionRegistry::new(),
            autosave,
            config,
        }
    }

    // --- Reading ---

    /// Borrow the live state.
    pub fn state(&self) -> &State {
        &self.state
    }

    /// An independent copy of the state, with stale selection ids dropped.
    pub fn get_state(&self) -> State {
        let mut state = self.state.clone();
        state.selection = state.live_selection();
        state
    }

    /// Value at a dotted key-path, `null` when absent.
    pub fn get(&self, path: &str) -> Value {
        change::resolve(&self.tree, path).clone()
    }

    pub fn device(&self, id: &str) -> Option<&Device> {
        self.state.devices.get(id)
    }

    pub fn connection(&self, id: &str) -> Option<&Connection> {
        self.state.connections.get(id)
    }

    pub fn layer(&self, id: &str) -> Option<&Layer> {
        self.state.layers.get(id)
    }

    /// Selected ids that still exist.
    pub fn selection(&self) -> IndexSet<String> {
        self.state.live_selection()
    }

    // --- Core mutation ---

    /// Merge a partial update into the state. Returns whether the tree
    /// changed.
    pub fn set_state(&mut self, patch: Value) -> bool {
        let next = merge::apply_patch(&self.state, &patch);
        self.commit(next)
    }

    /// Apply a typed edit to a copy of the state and commit it. Returns
    /// whether the tree changed.
    pub fn update(&mut self, edit: impl FnOnce(&mut State)) -> bool {
        let mut next = self.state.clone();
        edit(&mut next);
        self.commit(next)
    }

    fn commit(&mut self, mut next: State) -> bool {
        integrity::enforce(&mut next, &self.state, &self.config.default_layer_id);
        let next_tree = to_tree(&next);
        if change::equal(&self.tree, &next_tree) {
            return false;
        }

        let significant = change::is_significant(&self.tree, &next_tree);
        if log::log_enabled!(log::Level::Debug) {
            debug!(
                "Committing change to {:?} (significant: {})",
                change::changed_keys(&self.tree, &next_tree),
                significant
            );
        }

        let previous = std::mem::replace(&mut self.state, next);
        let previous_tree = std::mem::replace(&mut self.tree, next_tree);
        self.subscriptions.notify(&previous_tree, &self.tree);

        if significant {
            self.history.push(previous);
            self.autosave.mark_dirty();
        }
        true
    }

    /// Install a history snapshot without merging.
    fn install(&mut self, state: State) {
        let tree = to_tree(&state);
        self.state = state;
        let previous_tree = std::mem::replace(&mut self.tree, tree);
        self.subscriptions.notify(&previous_tree, &self.tree);
        self.autosave.mark_dirty();
    }

    // --- Subscriptions ---

    /// Call `callback(new, old)` whenever the value at `path` changes.
    pub fn subscribe<F>(&self, path: impl Into<String>, callback: F) -> Subscription
    where
        F: FnMut(&Value, &Value) + 'static,
    {
        self.subscribe_with(path, SubscribeOptions::default(), callback)
    }

    pub fn subscribe_with<F>(
        &self,
        path: impl Into<String>,
        options: SubscribeOptions,
        callback: F,
    ) -> Subscription
    where
        F: FnMut(&Value, &Value) + 'static,
    {
        self.subscriptions.subscribe(path, options, &self.tree, callback)
    }

    pub fn subscriptions(&self) -> &SubscriptionRegistry {
        &self.subscriptions
    }

    // --- History ---

    pub fn undo(&mut self) -> bool {
        if !self.history.can_undo() {
            return false;
        }
        let current = self.state.clone();
        match self.history.undo(current) {
            Some(snapshot) => {
                self.install(snapshot);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        if !self.history.can_redo() {
            return false;
        }
        let current = self.state.clone();
        match self.history.redo(current) {
            Some(snapshot) => {
                self.install(snapshot);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history(&self) -> &HistoryManager<State> {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    // --- Persistence ---

    /// Save now. Returns whether the document was written.
    pub fn save(&mut self) -> bool {
        self.autosave.save(&self.state)
    }

    /// Save if there are unsaved changes and the auto-save interval elapsed.
    /// Call this from the host's event loop.
    pub fn auto_save_tick(&mut self) -> bool {
        self.autosave.maybe_save(&self.state)
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.autosave.is_dirty()
    }

    // --- Devices ---

    /// Add a device and return its id, or `None` when the record could not
    /// be stored (for example a non-finite coordinate).
    ///
    /// A missing or already-taken id is replaced with a fresh one, and a
    /// device without a layer lands on the current layer.
    pub fn add_device(&mut self, mut device: Device) -> Option<DeviceId> {
        if device.id.is_empty() || self.state.devices.contains_key(&device.id) {
            device.id = new_device_id();
        }
        if device.layer.is_empty() {
            device.layer = self.state.current_layer.clone();
        }
        if self.state.canvas.snap_to_grid {
            let snapped = snap_to_grid(device.position(), self.state.config.grid_size);
            device.x = snapped.x;
            device.y = snapped.y;
        }

        let id = device.id.clone();
        let patch = record_patch("devices", &id, &device)?;
        self.set_state(patch);
        self.state.devices.contains_key(&id).then_some(id)
    }

    /// Merge `changes` into an existing device.
    pub fn update_device(&mut self, id: &str, changes: Value) -> bool {
        if !self.state.devices.contains_key(id) {
            warn!("Cannot update unknown device `{}`", id);
            return false;
        }
        self.set_state(keyed_patch("devices", id, changes))
    }

    /// Move a device, snapping to the grid when snapping is enabled.
    pub fn move_device(&mut self, id: &str, x: f64, y: f64) -> bool {
        if !self.state.devices.contains_key(id) {
            warn!("Cannot move unknown device `{}`", id);
            return false;
        }
        let mut target = Point::new(x, y);
        if self.state.canvas.snap_to_grid {
            target = snap_to_grid(target, self.state.config.grid_size);
        }
        let mut fields = Map::new();
        fields.insert("x".to_string(), target.x.into());
        fields.insert("y".to_string(), target.y.into());
        self.set_state(keyed_patch("devices", id, Value::Object(fields)))
    }

    /// Remove a device together with every connection touching it.
    pub fn remove_device(&mut self, id: &str) -> bool {
        if !self.state.devices.contains_key(id) {
            return false;
        }
        self.set_state(keyed_patch("devices", id, Value::Null))
    }

    // --- Connections ---

    /// Add a connection between two existing, distinct devices.
    pub fn add_connection(&mut self, mut connection: Connection) -> Option<ConnectionId> {
        if connection.is_self_loop() {
            warn!(
                "Rejecting connection from `{}` to itself",
                connection.device1
            );
            return None;
        }
        for endpoint in [&connection.device1, &connection.device2] {
            if !self.state.devices.contains_key(endpoint) {
                warn!("Rejecting connection to unknown device `{}`", endpoint);
                return None;
            }
        }
        if connection.id.is_empty() || self.state.connections.contains_key(&connection.id) {
            connection.id = new_connection_id();
        }

        let id = connection.id.clone();
        let patch = record_patch("connections", &id, &connection)?;
        self.set_state(patch);
        self.state.connections.contains_key(&id).then_some(id)
    }

    pub fn update_connection(&mut self, id: &str, changes: Value) -> bool {
        if !self.state.connections.contains_key(id) {
            warn!("Cannot update unknown connection `{}`", id);
            return false;
        }
        self.set_state(keyed_patch("connections", id, changes))
    }

    pub fn remove_connection(&mut self, id: &str) -> bool {
        if !self.state.connections.contains_key(id) {
            return false;
        }
        self.set_state(keyed_patch("connections", id, Value::Null))
    }

    // --- Layers ---

    /// Add a layer and return its id, or `None` when it could not be stored.
    /// A missing or taken id is regenerated.
    pub fn add_layer(&mut self, mut layer: Layer) -> Option<LayerId> {
        if layer.id.is_empty() || self.state.layers.contains_key(&layer.id) {
            layer.id = new_layer_id();
        }
        let id = layer.id.clone();
        let patch = record_patch("layers", &id, &layer)?;
        self.set_state(patch);
        self.state.layers.contains_key(&id).then_some(id)
    }

    /// Display order one past the highest existing layer.
    pub fn next_layer_order(&self) -> i32 {
        self.state
            .layers
            .values()
            .map(|layer| layer.order)
            .max()
            .map_or(0, |order| order + 1)
    }

    pub fn update_layer(&mut self, id: &str, changes: Value) -> bool {
        if !self.state.layers.contains_key(id) {
            warn!("Cannot update unknown layer `{}`", id);
            return false;
        }
        self.set_state(keyed_patch("layers", id, changes))
    }

    /// Remove a layer. Its devices move to the default layer. The default
    /// layer itself cannot be removed.
    pub fn remove_layer(&mut self, id: &str) -> bool {
        if id == self.config.default_layer_id {
            warn!("The default layer cannot be removed");
            return false;
        }
        if !self.state.layers.contains_key(id) {
            return false;
        }
        self.set_state(keyed_patch("layers", id, Value::Null))
    }

    pub fn set_current_layer(&mut self, id: &str) -> bool {
        if !self.state.layers.contains_key(id) {
            warn!("Cannot switch to unknown layer `{}`", id);
            return false;
        }
        self.set_state(serde_json::json!({ "currentLayer": id }));
        true
    }

    /// Flip a layer's visibility, returning the new value.
    pub fn toggle_layer_visibility(&mut self, id: &str) -> Option<bool> {
        let visible = !self.state.layers.get(id)?.visible;
        self.set_state(keyed_patch(
            "layers",
            id,
            serde_json::json!({ "visible": visible }),
        ));
        Some(visible)
    }

    // --- Selection ---

    /// Replace the selection. Unknown ids are skipped.
    pub fn select<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let selection: Vec<String> = ids
            .into_iter()
            .map(Into::into)
            .filter(|id| {
                let known = self.state.contains_entity(id);
                if !known {
                    debug!("Skipping unknown id `{}` in selection", id);
                }
                known
            })
            .collect();
        self.set_state(serde_json::json!({ "selection": selection }));
    }

    pub fn add_to_selection(&mut self, id: &str) -> bool {
        if !self.state.contains_entity(id) {
            return false;
        }
        let mut selection = self.state.live_selection();
        if !selection.insert(id.to_string()) {
            return false;
        }
        self.set_state(serde_json::json!({ "selection": selection }))
    }

    pub fn deselect(&mut self, id: &str) -> bool {
        let mut selection = self.state.live_selection();
        if !selection.shift_remove(id) {
            return false;
        }
        self.set_state(serde_json::json!({ "selection": selection }))
    }

    pub fn select_all(&mut self) {
        let ids: Vec<String> = self.state.devices.keys().cloned().collect();
        self.select(ids);
    }

    pub fn clear_selection(&mut self) {
        self.set_state(serde_json::json!({ "selection": [] }));
    }

    // --- Canvas ---

    /// Merge `changes` into the canvas view.
    pub fn update_canvas(&mut self, changes: Value) -> bool {
        let mut patch = Map::new();
        patch.insert("canvas".to_string(), changes);
        self.set_state(Value::Object(patch))
    }

    /// Pan the view by a screen-space delta.
    pub fn pan_by(&mut self, delta: Vec2) -> bool {
        self.update(|state| {
            state.canvas.pan_x += delta.x;
            state.canvas.pan_y += delta.y;
        })
    }

    /// Zoom by `factor` about a screen point, clamped to the zoom limits.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) -> bool {
        self.update(|state| state.canvas = state.canvas.zoomed_at(screen_point, factor))
    }

    /// Frame every device in the viewport.
    pub fn fit_to_content(&mut self, padding: f64) -> bool {
        let Some(bounds) = self.state.bounds() else {
            return false;
        };
        self.update(|state| state.canvas = state.canvas.fitted_to(bounds, padding))
    }

    /// Record render counters. These never enter history.
    pub fn update_performance(&mut self, stats: Value) -> bool {
        let mut patch = Map::new();
        patch.insert("performance".to_string(), stats);
        self.set_state(Value::Object(patch))
    }

    // --- Bulk operations ---

    /// Replace devices, connections and layers with an imported diagram as a
    /// single update. Layers are kept when the diagram brings none.
    pub fn load_diagram(&mut self, diagram: Diagram) -> bool {
        info!(
            "Loading diagram with {} devices, {} connections, {} layers",
            diagram.devices.len(),
            diagram.connections.len(),
            diagram.layers.len()
        );
        self.update(|state| {
            if !diagram.layers.is_empty() {
                state.layers = diagram
                    .layers
                    .into_iter()
                    .map(|mut layer| {
                        if layer.id.is_empty() {
                            layer.id = new_layer_id();
                        }
                        (layer.id.clone(), layer)
                    })
                    .collect();
            }
            state.devices = diagram
                .devices
                .into_iter()
                .map(|mut device| {
                    if device.id.is_empty() {
                        device.id = new_device_id();
                    }
                    (device.id.clone(), device)
                })
                .collect();
            state.connections = diagram
                .connections
                .into_iter()
                .map(|mut connection| {
                    if connection.id.is_empty() {
                        connection.id = new_connection_id();
                    }
                    (connection.id.clone(), connection)
                })
                .collect();
            if let Some(name) = diagram.name {
                state.project.name = name;
            }
            state.selection.clear();
        })
    }

    /// The diagram part of the state as pretty-printed JSON.
    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        Diagram::from_state(&self.state).to_json()
    }

    /// Return to a fresh default state as one undoable update.
    pub fn reset(&mut self) -> bool {
        let canvas_size = (self.state.canvas.width, self.state.canvas.height);
        self.update(|state| {
            *state = State::default();
            state.canvas.width = canvas_size.0;
            state.canvas.height = canvas_size.1;
        })
    }
}

fn to_tree(state: &State) -> Value {
    serde_json::to_value(state).unwrap_or_else(|e| {
        error!("Failed to serialize state: {}", e);
        Value::Null
    })
}

/// `{ collection: { id: value } }`
fn keyed_patch(collection: &str, id: &str, value: Value) -> Value {
    let mut entries = Map::new();
    entries.insert(id.to_string(), value);
    let mut patch = Map::new();
    patch.insert(collection.to_string(), Value::Object(entries));
    Value::Object(patch)
}

fn record_patch<T: Serialize>(collection: &str, id: &str, record: &T) -> Option<Value> {
    match serde_json::to_value(record) {
        Ok(value) => Some(keyed_patch(collection, id, value)),
        Err(e) => {
            warn!("Failed to serialize {} entry `{}`: {}", collection, id, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MAX_ZOOM, MIN_ZOOM};
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    fn store() -> StateStore {
        StateStore::in_memory()
    }

    fn router(id: &str, layer: &str) -> Device {
        Device::with_id(id, "router", 0.0, 0.0, layer)
    }

    #[test]
    fn test_fresh_store() {
        let store = store();
        assert!(store.state().devices.is_empty());
        assert!(!store.can_undo());
        assert!(!store.has_unsaved_changes());
        assert_eq!(store.get("currentLayer"), json!("default"));
        assert_eq!(store.get("no.such.path"), Value::Null);
    }

    #[test]
    fn test_add_device_assigns_defaults() {
        let mut store = store();
        let id = store
            .add_device(Device::with_id("", "switch", 3.0, 4.0, ""))
            .unwrap();
        assert!(id.starts_with("device-"));
        let device = store.device(&id).unwrap();
        assert_eq!(device.layer, "default");
        assert_eq!(store.layer("default").unwrap().device_count, 1);
        assert!(store.can_undo());
        assert!(store.has_unsaved_changes());
    }

    #[test]
    fn test_add_device_with_taken_id_gets_fresh_id() {
        let mut store = store();
        store.add_device(router("d1", "core"));
        let second = store.add_device(router("d1", "core")).unwrap();
        assert_ne!(second, "d1");
        assert_eq!(store.state().devices.len(), 2);
    }

    #[test]
    fn test_add_device_with_non_finite_coordinate_is_not_stored() {
        let mut store = store();
        let depth = store.history().undo_depth();

        assert_eq!(store.add_device(router("d1", "core")).as_deref(), Some("d1"));
        let nan = Device::with_id("d2", "router", f64::NAN, 0.0, "core");
        assert_eq!(store.add_device(nan), None);
        let infinite = Device::with_id("d3", "router", 0.0, f64::INFINITY, "core");
        assert_eq!(store.add_device(infinite), None);

        assert!(store.device("d2").is_none());
        assert!(store.device("d3").is_none());
        assert_eq!(store.history().undo_depth(), depth + 1);
    }

    #[test]
    fn test_add_device_keeps_typed_fields_over_extension_fields() {
        let mut store = store();
        let device = router("d1", "core")
            .with_field("type", 7)
            .with_field("layer", "ghost")
            .with_field("rack", "B2");

        assert_eq!(store.add_device(device).as_deref(), Some("d1"));
        let stored = store.device("d1").unwrap();
        assert_eq!(stored.device_type, "router");
        assert_eq!(stored.layer, "core");
        assert_eq!(stored.extra.get("rack"), Some(&json!("B2")));
        assert!(!stored.extra.contains_key("type"));
    }

    #[test]
    fn test_unstorable_records_return_none() {
        let mut store = store();
        store.add_device(router("d1", "core"));
        store.add_device(router("d2", "core"));

        let mut device = router("d3", "core");
        device.extra.insert("x".to_string(), json!("left"));
        assert_eq!(store.add_device(device), None);
        assert!(store.device("d3").is_none());

        let mut connection = Connection::with_id("c1", "d1", "d2");
        connection.extra.insert("type".to_string(), json!(7));
        assert_eq!(store.add_connection(connection), None);
        assert!(store.state().connections.is_empty());
    }

    #[test]
    fn test_move_device_snaps_when_enabled() {
        let mut store = store();
        store.add_device(router("d1", "core"));
        store.update_canvas(json!({ "snapToGrid": true }));

        assert!(store.move_device("d1", 33.0, 47.0));
        let device = store.device("d1").unwrap();
        assert_eq!((device.x, device.y), (40.0, 40.0));
        assert!(!store.move_device("missing", 0.0, 0.0));
    }

    #[test]
    fn test_update_device_keeps_id_and_merges_extra() {
        let mut store = store();
        store.add_device(router("d1", "core").with_field("ip", "10.0.0.1"));
        assert!(store.update_device("d1", json!({ "id": "other", "name": "edge" })));

        let device = store.device("d1").unwrap();
        assert_eq!(device.id, "d1");
        assert_eq!(device.name, "edge");
        assert_eq!(device.extra["ip"], json!("10.0.0.1"));
        assert!(!store.update_device("nope", json!({ "name": "x" })));
    }

    #[test]
    fn test_add_connection_validation() {
        let mut store = store();
        store.add_device(router("d1", "core"));
        store.add_device(router("d2", "access"));

        assert!(store.add_connection(Connection::new("d1", "d1")).is_none());
        assert!(store.add_connection(Connection::new("d1", "ghost")).is_none());

        let id = store.add_connection(Connection::new("d1", "d2")).unwrap();
        assert!(id.starts_with("connection-"));
        assert_eq!(store.connection(&id).unwrap().medium, "ethernet");
    }

    #[test]
    fn test_remove_device_cascades() {
        let mut store = store();
        store.add_device(router("d1", "core"));
        store.add_device(router("d2", "core"));
        store.add_connection(Connection::with_id("c1", "d1", "d2"));

        assert!(store.remove_device("d1"));
        assert!(store.state().connections.is_empty());
        assert!(!store.remove_device("d1"));
    }

    #[test]
    fn test_layer_operations() {
        let mut store = store();
        let order = store.next_layer_order();
        assert_eq!(order, 4);
        let id = store.add_layer(Layer::with_id("dmz", "DMZ", order));
        assert_eq!(id.as_deref(), Some("dmz"));
        let generated = store
            .add_layer(Layer::with_id("dmz", "DMZ copy", order + 1))
            .unwrap();
        assert_ne!(generated, "dmz");
        assert!(store.layer(&generated).is_some());

        assert!(store.set_current_layer("dmz"));
        assert!(!store.set_current_layer("ghost"));
        assert_eq!(store.toggle_layer_visibility("dmz"), Some(false));
        assert_eq!(store.toggle_layer_visibility("ghost"), None);
        assert!(store.update_layer("dmz", json!({ "locked": true })));
        assert!(store.layer("dmz").unwrap().locked);

        assert!(store.remove_layer("dmz"));
        assert_eq!(store.state().current_layer, "default");
        assert!(!store.remove_layer("default"));
        assert!(!store.remove_layer("dmz"));
    }

    #[test]
    fn test_selection_is_not_recorded() {
        let mut store = store();
        store.add_device(router("d1", "core"));
        store.add_device(router("d2", "core"));
        let depth = store.history().undo_depth();

        store.select(["d1", "ghost"]);
        assert_eq!(store.selection().len(), 1);
        assert!(store.add_to_selection("d2"));
        assert!(!store.add_to_selection("d2"));
        assert!(store.deselect("d1"));
        store.clear_selection();
        assert!(store.selection().is_empty());

        assert_eq!(store.history().undo_depth(), depth);
    }

    #[test]
    fn test_get_state_prunes_stale_selection() {
        let mut store = store();
        store.add_device(router("d1", "core"));
        store.select(["d1"]);
        store.remove_device("d1");

        assert!(store.get_state().selection.is_empty());
    }

    #[test]
    fn test_view_changes_are_cosmetic() {
        let mut store = store();
        assert!(store.pan_by(Vec2::new(10.0, 5.0)));
        assert!(store.zoom_at(Point::new(100.0, 100.0), 2.0));
        assert!(!store.can_undo());
        assert!(!store.has_unsaved_changes());
        assert_eq!(store.get("canvas.zoom"), json!(2.0));
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut store = store();
        store.zoom_at(Point::ZERO, 100.0);
        assert_eq!(store.state().canvas.zoom, crate::model::MAX_ZOOM);
    }

    #[test]
    fn test_undo_redo_restores_snapshots() {
        let mut store = store();
        store.add_device(router("d1", "core"));
        store.add_device(router("d2", "core"));

        assert!(store.undo());
        assert!(store.device("d2").is_none());
        assert!(store.redo());
        assert!(store.device("d2").is_some());
        assert!(!store.redo());
    }

    #[test]
    fn test_undo_notifies_subscribers() {
        let mut store = store();
        let calls = Rc::new(RefCell::new(0));
        let counter = calls.clone();
        let _sub = store.subscribe("devices", move |_, _| *counter.borrow_mut() += 1);

        store.add_device(router("d1", "core"));
        store.undo();
        assert_eq!(*calls.borrow(), 2);
    }

    #[test]
    fn test_noop_update_does_not_notify() {
        let mut store = store();
        let calls = Rc::new(RefCell::new(0));
        let counter = calls.clone();
        let _sub = store.subscribe("project", move |_, _| *counter.borrow_mut() += 1);

        assert!(!store.set_state(json!({ "project": { "name": "Untitled Network" } })));
        assert_eq!(*calls.borrow(), 0);
        assert!(!store.can_undo());
    }

    #[test]
    fn test_load_diagram_and_export() {
        let mut store = store();
        store.add_device(router("old", "core"));

        let diagram = Diagram {
            name: Some("Branch".to_string()),
            devices: vec![router("a", "access"), router("b", "access")],
            connections: vec![Connection::with_id("ab", "a", "b"), Connection::new("a", "zzz")],
            layers: vec![],
        };
        assert!(store.load_diagram(diagram));

        let state = store.state();
        assert!(!state.devices.contains_key("old"));
        assert_eq!(state.connections.len(), 1);
        assert_eq!(state.project.name, "Branch");
        assert_eq!(state.layers.len(), 4);

        let exported = Diagram::from_json(&store.export_json().unwrap()).unwrap();
        assert_eq!(exported.devices.len(), 2);

        assert!(store.undo());
        assert!(store.device("old").is_some());
    }

    #[test]
    fn test_reset_is_undoable() {
        let mut store = store();
        store.add_device(router("d1", "core"));
        assert!(store.reset());
        assert!(store.state().devices.is_empty());
        assert!(store.undo());
        assert!(store.device("d1").is_some());
    }

    #[test]
    fn test_save_and_restore() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let mut store = StateStore::new(StoreConfig::default(), storage.clone());
        store.add_device(router("d1", "core"));
        assert!(store.save());
        assert!(!store.has_unsaved_changes());

        let restored = StateStore::restore(StoreConfig::default(), storage);
        assert!(restored.device("d1").is_some());
        assert_eq!(restored.layer("core").unwrap().device_count, 1);
        assert!(!restored.can_undo());
    }

    #[test]
    fn test_auto_save_tick() {
        let config = StoreConfig::default().with_auto_save_interval(Some(Duration::ZERO));
        let mut store = StateStore::new(config, Arc::new(MemoryStorage::new()));
        assert!(!store.auto_save_tick());
        store.add_device(router("d1", "core"));
        assert!(store.auto_save_tick());
        assert!(!store.has_unsaved_changes());
    }

    #[test]
    fn test_with_state_repairs_and_starts_clean() {
        let mut state = State::default();
        state.devices.insert("d1".into(), router("d1", "ghost"));
        state.selection.insert("d1".into());
        let mut store =
            StateStore::with_state(StoreConfig::default(), Arc::new(MemoryStorage::new()), state);

        assert_eq!(store.device("d1").unwrap().layer, "default");
        assert_eq!(store.state().devices_on("default").count(), 1);
        assert!(!store.has_unsaved_changes());

        store.add_device(router("d2", "core"));
        store.select_all();
        assert_eq!(store.selection().len(), 2);
    }

    #[test]
    fn test_clear_history() {
        let config = StoreConfig::default().with_max_history_size(5);
        let mut store = StateStore::new(config, Arc::new(MemoryStorage::new()));
        assert_eq!(store.history().max_size(), 5);

        store.add_device(router("d1", "core"));
        store.add_device(router("d2", "core"));
        store.undo();
        assert_eq!(store.history().redo_depth(), 1);

        store.clear_history();
        assert!(!store.can_undo());
        assert!(!store.can_redo());
    }

    #[test]
    fn test_fit_to_content() {
        let mut store = store();
        assert!(!store.fit_to_content(20.0));
        store.add_device(Device::with_id("a", "router", 0.0, 0.0, "core"));
        store.add_device(Device::with_id("b", "router", 400.0, 300.0, "core"));
        assert!(store.fit_to_content(20.0));
        assert!(store.state().canvas.zoom > 1.0);
    }

    #[test]
    fn test_raw_zoom_patch_is_clamped() {
        let mut store = store();
        assert!(store.set_state(json!({ "canvas": { "zoom": 0 } })));
        assert_eq!(store.state().canvas.zoom, MIN_ZOOM);
        assert_eq!(store.get("canvas.zoom"), json!(MIN_ZOOM));

        let world = store.state().canvas.screen_to_world(Point::new(10.0, 10.0));
        assert!(world.x.is_finite() && world.y.is_finite());

        store.set_state(json!({ "canvas": { "zoom": 1000.0 } }));
        assert_eq!(store.state().canvas.zoom, MAX_ZOOM);
    }
}
