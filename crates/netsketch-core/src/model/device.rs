//! Device records: the nodes of the topology graph.

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{DeviceId, LayerId};

/// Operational status reported for a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Online,
    Offline,
    Warning,
    #[default]
    Unknown,
}

/// Serialized names of the typed fields. Extension fields may not reuse them.
pub const RESERVED_FIELDS: [&str; 7] = ["id", "type", "name", "x", "y", "layer", "status"];

/// A node placed on the canvas.
///
/// Known fields are typed; anything device-type specific (telemetry,
/// addresses, vendor fields) lives in `extra` and round-trips untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Unique id. The collection key is authoritative for this value.
    #[serde(default)]
    pub id: DeviceId,
    /// Catalog type, e.g. `router` or `switch`.
    #[serde(rename = "type")]
    pub device_type: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Canvas x coordinate (world space).
    #[serde(default)]
    pub x: f64,
    /// Canvas y coordinate (world space).
    #[serde(default)]
    pub y: f64,
    /// Owning layer id.
    #[serde(default)]
    pub layer: LayerId,
    #[serde(default)]
    pub status: DeviceStatus,
    /// Open-ended metadata.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Device {
    /// Create a device with a freshly generated id.
    pub fn new(device_type: impl Into<String>, x: f64, y: f64, layer: impl Into<LayerId>) -> Self {
        Self::with_id(generate_id(), device_type, x, y, layer)
    }

    /// Create a device with a caller-chosen id.
    pub fn with_id(
        id: impl Into<DeviceId>,
        device_type: impl Into<String>,
        x: f64,
        y: f64,
        layer: impl Into<LayerId>,
    ) -> Self {
        Self {
            id: id.into(),
            device_type: device_type.into(),
            name: String::new(),
            x,
            y,
            layer: layer.into(),
            status: DeviceStatus::default(),
            extra: Map::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_status(mut self, status: DeviceStatus) -> Self {
        self.status = status;
        self
    }

    /// Attach an extension field. Keys naming a typed field are ignored.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if RESERVED_FIELDS.contains(&key.as_str()) {
            warn!("Ignoring extension field `{}` on device `{}`", key, self.id);
        } else {
            self.extra.insert(key, value.into());
        }
        self
    }

    /// Position as a point in world coordinates.
    pub fn position(&self) -> kurbo::Point {
        kurbo::Point::new(self.x, self.y)
    }
}

/// Generate a fresh device id.
pub fn generate_id() -> DeviceId {
    format!("device-{}", Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_device_has_unique_id() {
        let a = Device::new("router", 0.0, 0.0, "core");
        let b = Device::new("router", 0.0, 0.0, "core");
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("device-"));
    }

    #[test]
    fn test_extra_fields_flatten() {
        let device = Device::with_id("d1", "switch", 10.0, 20.0, "access")
            .named("sw-01")
            .with_field("cpu", 42);

        let value = serde_json::to_value(&device).unwrap();
        assert_eq!(value["type"], json!("switch"));
        assert_eq!(value["cpu"], json!(42));
        assert_eq!(value["status"], json!("unknown"));

        let back: Device = serde_json::from_value(value).unwrap();
        assert_eq!(back, device);
    }

    #[test]
    fn test_with_field_ignores_reserved_keys() {
        let device = Device::with_id("d1", "router", 1.0, 2.0, "core")
            .with_field("type", 7)
            .with_field("x", "left")
            .with_field("id", "d2")
            .with_field("vendor", "acme");

        assert_eq!(device.extra.len(), 1);
        let value = serde_json::to_value(&device).unwrap();
        assert_eq!(value["type"], json!("router"));
        assert_eq!(value["x"], json!(1.0));
        assert_eq!(value["vendor"], json!("acme"));
        assert_eq!(serde_json::from_value::<Device>(value).unwrap(), device);
    }

    #[test]
    fn test_missing_type_is_rejected() {
        let result = serde_json::from_value::<Device>(json!({ "x": 1.0, "y": 2.0 }));
        assert!(result.is_err());
    }
}
