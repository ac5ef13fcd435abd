//! Structural change detection over the serialized state tree.
//!
//! The store keeps a `serde_json::Value` view of the tree next to the typed
//! one. Subscriptions and history decisions are made by comparing those views
//! by value, so a fresh copy with identical contents never counts as a change.

use serde_json::{Map, Value};

/// Key-paths whose changes are cosmetic: they never enter undo history and
/// never mark the project as having unsaved changes.
pub const COSMETIC_PATHS: &[&str] = &[
    "performance",
    "ui",
    "selection",
    "canvas.zoom",
    "canvas.panX",
    "canvas.panY",
    "canvas.width",
    "canvas.height",
];

static MISSING: Value = Value::Null;

/// Structural equality.
///
/// Sequences compare element-wise in order. Objects compare by key set and
/// recursively equal values, ignoring key order. Numbers compare by value, so
/// `1` and `1.0` are equal.
pub fn equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| equal(x, y))
        }
        (Value::Object(x), Value::Object(y)) => objects_equal(x, y),
        _ => false,
    }
}

fn objects_equal(a: &Map<String, Value>, b: &Map<String, Value>) -> bool {
    a.len() == b.len()
        && a.iter()
            .all(|(key, value)| b.get(key).is_some_and(|other| equal(value, other)))
}

/// Resolve a dotted key-path. Missing segments resolve to `null`.
pub fn resolve<'a>(root: &'a Value, path: &str) -> &'a Value {
    if path.is_empty() {
        return root;
    }
    let mut current = root;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => match map.get(segment) {
                Some(next) => next,
                None => return &MISSING,
            },
            Value::Array(items) => match segment.parse::<usize>().ok().and_then(|i| items.get(i)) {
                Some(next) => next,
                None => return &MISSING,
            },
            _ => return &MISSING,
        };
    }
    current
}

/// A copy of `root` with every listed key-path removed.
pub fn without_paths(root: &Value, paths: &[&str]) -> Value {
    let mut copy = root.clone();
    for path in paths {
        remove_path(&mut copy, path);
    }
    copy
}

fn remove_path(root: &mut Value, path: &str) {
    let (parent, leaf) = match path.rsplit_once('.') {
        Some((parent, leaf)) => (Some(parent), leaf),
        None => (None, path),
    };

    let mut target = root;
    if let Some(parent) = parent {
        for segment in parent.split('.') {
            match target.get_mut(segment) {
                Some(next) => target = next,
                None => return,
            }
        }
    }
    if let Value::Object(map) = target {
        map.remove(leaf);
    }
}

/// Whether the difference between two trees touches anything outside
/// [`COSMETIC_PATHS`].
pub fn is_significant(prev: &Value, next: &Value) -> bool {
    !equal(
        &without_paths(prev, COSMETIC_PATHS),
        &without_paths(next, COSMETIC_PATHS),
    )
}

/// Top-level keys whose values differ between the two trees.
pub fn changed_keys(prev: &Value, next: &Value) -> Vec<String> {
    let (Value::Object(prev), Value::Object(next)) = (prev, next) else {
        return Vec::new();
    };
    let mut keys: Vec<String> = next
        .iter()
        .filter(|(key, value)| !prev.get(*key).is_some_and(|old| equal(old, value)))
        .map(|(key, _)| key.clone())
        .collect();
    keys.extend(prev.keys().filter(|key| !next.contains_key(*key)).cloned());
    keys
}
