//! Applying partial updates to the state tree.
//!
//! Merge rules are fixed per top-level field:
//!
//! | field | rule |
//! |-------|------|
//! | `devices`, `connections`, `layers` | merged by key; `null` removes the entry |
//! | `canvas`, `ui`, `project`, `config`, `performance` | merged key by key, recursively |
//! | `selection`, `currentLayer` | replaced wholesale |
//!
//! Inside a record, nested objects merge recursively while sequences and
//! scalars are replaced. A fragment that does not fit its field is logged and
//! skipped; the rest of the patch still applies.

use indexmap::IndexMap;
use log::warn;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::model::State;

/// Merge `patch` into a copy of `base`.
pub fn apply_patch(base: &State, patch: &Value) -> State {
    let mut next = base.clone();
    let Some(fields) = patch.as_object() else {
        warn!("Ignoring state patch that is not an object: {}", patch);
        return next;
    };

    for (key, fragment) in fields {
        match key.as_str() {
            "devices" => merge_collection(&mut next.devices, fragment, key),
            "connections" => merge_collection(&mut next.connections, fragment, key),
            "layers" => merge_collection(&mut next.layers, fragment, key),
            "currentLayer" => replace_field(&mut next.current_layer, fragment, key),
            "selection" => replace_field(&mut next.selection, fragment, key),
            "canvas" => merge_record(&mut next.canvas, fragment, key),
            "ui" => merge_record(&mut next.ui, fragment, key),
            "project" => merge_record(&mut next.project, fragment, key),
            "config" => merge_record(&mut next.config, fragment, key),
            "performance" => merge_record(&mut next.performance, fragment, key),
            other => warn!("Ignoring unknown state field `{}`", other),
        }
    }

    next
}

/// Recursive key-wise merge of JSON values. Objects merge, everything else
/// is replaced.
pub fn merge_values(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                let nested = value.is_object() && target.get(key).is_some_and(Value::is_object);
                if !nested {
                    target.insert(key.clone(), value.clone());
                } else if let Some(existing) = target.get_mut(key) {
                    merge_values(existing, value);
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

fn replace_field<T: DeserializeOwned>(target: &mut T, fragment: &Value, path: &str) {
    match serde_json::from_value(fragment.clone()) {
        Ok(value) => *target = value,
        Err(e) => warn!("Ignoring malformed `{}` update: {}", path, e),
    }
}

fn merge_record<T: Serialize + DeserializeOwned>(target: &mut T, fragment: &Value, path: &str) {
    if !fragment.is_object() {
        warn!("Ignoring `{}` update: expected an object, got {}", path, fragment);
        return;
    }

    let mut merged = match serde_json::to_value(&*target) {
        Ok(value) => value,
        Err(e) => {
            warn!("Could not serialize `{}` for merging: {}", path, e);
            return;
        }
    };
    merge_values(&mut merged, fragment);

    match serde_json::from_value(merged) {
        Ok(value) => *target = value,
        Err(e) => warn!("Ignoring malformed `{}` update: {}", path, e),
    }
}

fn merge_collection<T: Serialize + DeserializeOwned>(
    target: &mut IndexMap<String, T>,
    fragment: &Value,
    path: &str,
) {
    let Some(entries) = fragment.as_object() else {
        warn!("Ignoring `{}` update: expected an object keyed by id, got {}", path, fragment);
        return;
    };

    for (id, entry) in entries {
        if entry.is_null() {
            target.shift_remove(id);
            continue;
        }
        if !entry.is_object() {
            warn!("Ignoring `{}.{}` update: expected an object, got {}", path, id, entry);
            continue;
        }

        let mut merged = match target.get(id) {
            Some(existing) => match serde_json::to_value(existing) {
                Ok(value) => value,
                Err(e) => {
                    warn!("Could not serialize `{}.{}` for merging: {}", path, id, e);
                    continue;
                }
            },
            None => Value::Object(Map::new()),
        };
        merge_values(&mut merged, entry);
        if let Value::Object(fields) = &mut merged {
            fields.insert("id".to_string(), Value::String(id.clone()));
        }

        match serde_json::from_value(merged) {
            // IndexMap::insert keeps the position of an existing key.
            Ok(record) => {
                target.insert(id.clone(), record);
            }
            Err(e) => warn!("Ignoring malformed `{}.{}` update: {}", path, id, e),
        }
    }
}
