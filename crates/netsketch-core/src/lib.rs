//! NetSketch Core Library
//!
//! Reactive state store for the NetSketch network-topology editor: the
//! diagram state tree, partial updates with integrity repair, key-path
//! subscriptions, bounded undo/redo, and versioned persistence.

pub mod change;
pub mod config;
pub mod history;
pub mod integrity;
pub mod merge;
pub mod model;
pub mod storage;
pub mod store;
pub mod subscription;

pub use config::StoreConfig;
pub use history::{HistoryManager, MAX_HISTORY_SIZE};
pub use integrity::IntegrityReport;
pub use model::{
    CanvasView, Connection, ConnectionId, ConnectionStatus, Device, DeviceId, DeviceStatus,
    Diagram, Layer, LayerId, State, DEFAULT_LAYER_ID,
};
pub use storage::{
    AutoSaveManager, FileStorage, MemoryStorage, PersistenceAdapter, Storage, StorageError,
    StorageResult,
};
pub use store::StateStore;
pub use subscription::{SubscribeOptions, Subscription, SubscriptionRegistry};
