//! Connection records: non-owning edges between two devices.

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{ConnectionId, DeviceId};

/// Default transmission medium for new connections.
pub const DEFAULT_MEDIUM: &str = "ethernet";

/// Serialized names of the typed fields. Extension fields may not reuse them.
pub const RESERVED_FIELDS: [&str; 5] = ["id", "device1", "device2", "type", "status"];

/// Link status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Active,
    Inactive,
    Degraded,
}

/// An edge between `device1` and `device2`.
///
/// Only ids are stored. Both endpoints must exist and must differ, otherwise
/// the connection is dropped on the next commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    #[serde(default)]
    pub id: ConnectionId,
    pub device1: DeviceId,
    pub device2: DeviceId,
    /// Medium, e.g. `ethernet`, `fiber`, `wireless`.
    #[serde(rename = "type", default = "default_medium")]
    pub medium: String,
    #[serde(default)]
    pub status: ConnectionStatus,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_medium() -> String {
    DEFAULT_MEDIUM.to_string()
}

impl Connection {
    /// Create a connection with a freshly generated id.
    pub fn new(device1: impl Into<DeviceId>, device2: impl Into<DeviceId>) -> Self {
        Self::with_id(generate_id(), device1, device2)
    }

    pub fn with_id(
        id: impl Into<ConnectionId>,
        device1: impl Into<DeviceId>,
        device2: impl Into<DeviceId>,
    ) -> Self {
        Self {
            id: id.into(),
            device1: device1.into(),
            device2: device2.into(),
            medium: default_medium(),
            status: ConnectionStatus::default(),
            extra: Map::new(),
        }
    }

    pub fn with_medium(mut self, medium: impl Into<String>) -> Self {
        self.medium = medium.into();
        self
    }

    pub fn with_status(mut self, status: ConnectionStatus) -> Self {
        self.status = status;
        self
    }

    /// Attach an extension field. Keys naming a typed field are ignored.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if RESERVED_FIELDS.contains(&key.as_str()) {
            warn!("Ignoring extension field `{}` on connection `{}`", key, self.id);
        } else {
            self.extra.insert(key, value.into());
        }
        self
    }

    /// Whether this connection touches the given device.
    pub fn references(&self, device: &str) -> bool {
        self.device1 == device || self.device2 == device
    }

    pub fn is_self_loop(&self) -> bool {
        self.device1 == self.device2
    }
}

/// Generate a fresh connection id.
pub fn generate_id() -> ConnectionId {
    format!("connection-{}", Uuid::new_v4())
}
