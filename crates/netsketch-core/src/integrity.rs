//! Cross-entity invariants of the state tree.
//!
//! Violations are repaired rather than rejected: dangling or self-looping
//! connections are dropped, devices on missing layers move to the default
//! layer, and a removed default layer is put back. The canvas zoom is kept
//! within [`MIN_ZOOM`, `MAX_ZOOM`].

use log::debug;

use crate::model::{Layer, MAX_ZOOM, MIN_ZOOM, State};

/// What a call to [`enforce`] had to fix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    pub restored_default_layer: bool,
    pub reassigned_devices: Vec<String>,
    pub removed_connections: Vec<String>,
    pub reset_current_layer: bool,
    pub clamped_zoom: bool,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        !self.restored_default_layer
            && self.reassigned_devices.is_empty()
            && self.removed_connections.is_empty()
            && !self.reset_current_layer
            && !self.clamped_zoom
    }
}

/// Repair `state` in place so every invariant holds.
///
/// `previous` is the last committed tree; the default layer is restored from
/// it when a patch removed it.
pub fn enforce(state: &mut State, previous: &State, default_layer: &str) -> IntegrityReport {
    let mut report = IntegrityReport::default();

    if !state.layers.contains_key(default_layer) {
        let layer = previous
            .layers
            .get(default_layer)
            .cloned()
            .unwrap_or_else(|| Layer::with_id(default_layer, "Default", 0));
        state.layers.shift_insert(0, default_layer.to_string(), layer);
        report.restored_default_layer = true;
    }

    for device in state.devices.values_mut() {
        if !state.layers.contains_key(&device.layer) {
            device.layer = default_layer.to_string();
            report.reassigned_devices.push(device.id.clone());
        }
    }

    let devices = &state.devices;
    state.connections.retain(|id, connection| {
        let valid = !connection.is_self_loop()
            && devices.contains_key(&connection.device1)
            && devices.contains_key(&connection.device2);
        if !valid {
            report.removed_connections.push(id.clone());
        }
        valid
    });

    if !state.layers.contains_key(&state.current_layer) {
        state.current_layer = default_layer.to_string();
        report.reset_current_layer = true;
    }

    let zoom = state.canvas.zoom;
    if !(MIN_ZOOM..=MAX_ZOOM).contains(&zoom) {
        state.canvas.zoom = if zoom.is_nan() {
            1.0
        } else {
            zoom.clamp(MIN_ZOOM, MAX_ZOOM)
        };
        report.clamped_zoom = true;
    }

    for layer in state.layers.values_mut() {
        layer.device_count = 0;
    }
    for device in state.devices.values() {
        if let Some(layer) = state.layers.get_mut(&device.layer) {
            layer.device_count += 1;
        }
    }

    if !report.is_clean() {
        debug!("Integrity repairs applied: {:?}", report);
    }
    report
}

/// Whether every invariant holds, without repairing anything.
pub fn check(state: &State, default_layer: &str) -> bool {
    state.layers.contains_key(default_layer)
        && state.layers.contains_key(&state.current_layer)
        && (MIN_ZOOM..=MAX_ZOOM).contains(&state.canvas.zoom)
        && state
            .devices
            .values()
            .all(|device| state.layers.contains_key(&device.layer))
        && state.connections.values().all(|connection| {
            !connection.is_self_loop()
                && state.devices.contains_key(&connection.device1)
                && state.devices.contains_key(&connection.device2)
        })
}
