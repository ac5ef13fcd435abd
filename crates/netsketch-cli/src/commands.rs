//! Command implementations.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use log::{debug, info, warn};
use netsketch_core::storage::create_default_storage;
use netsketch_core::{
    Connection, Device, Diagram, FileStorage, Layer, StateStore, Storage, StoreConfig,
};

use crate::cli::{AddDeviceArgs, Cli, Command};
use crate::error::{CliError, CliResult};

/// Open the store on the configured storage, restoring the saved state.
fn open_store(cli: &Cli) -> CliResult<StateStore> {
    let storage = match &cli.data_dir {
        Some(dir) => Arc::new(FileStorage::new(dir.clone())?),
        None => create_default_storage()?,
    };
    debug!("Using storage at {}", storage.base_path().display());
    let storage: Arc<dyn Storage> = storage;

    // One-shot invocations save explicitly.
    let mut config = StoreConfig::default().with_auto_save_interval(None);
    if let Some(key) = &cli.key {
        config = config.with_storage_key(key.clone());
    }
    Ok(StateStore::restore(config, storage))
}

pub fn run(cli: &Cli) -> CliResult<()> {
    let mut store = open_store(cli)?;

    match &cli.command {
        Command::Summary => print_summary(&store),
        Command::Get { path } => println!("{:#}", store.get(path)),
        Command::Export { file } => export(&store, file)?,
        Command::Import { file } => {
            import(&mut store, file)?;
            persist(&mut store)?;
        }
        Command::AddDevice(args) => {
            let id = add_device(&mut store, args)?;
            persist(&mut store)?;
            println!("{id}");
        }
        Command::MoveDevice { id, x, y } => {
            require_device(&store, id)?;
            store.move_device(id, *x, *y);
            persist(&mut store)?;
        }
        Command::RemoveDevice { id } => {
            require_device(&store, id)?;
            let dropped = store.state().connections_of(id).count();
            store.remove_device(id);
            persist(&mut store)?;
            println!("Removed {id} and {dropped} connection(s)");
        }
        Command::Connect {
            device1,
            device2,
            medium,
            id,
        } => {
            let mut connection = match id {
                Some(id) => Connection::with_id(id.clone(), device1.clone(), device2.clone()),
                None => Connection::new(device1.clone(), device2.clone()),
            };
            if let Some(medium) = medium {
                connection = connection.with_medium(medium.clone());
            }
            let id = store.add_connection(connection).ok_or_else(|| {
                CliError::Rejected(format!(
                    "Cannot connect `{device1}` to `{device2}`: endpoints must be two existing devices"
                ))
            })?;
            persist(&mut store)?;
            println!("{id}");
        }
        Command::Disconnect { id } => {
            if !store.remove_connection(id) {
                return Err(CliError::NotFound {
                    kind: "connection",
                    id: id.clone(),
                });
            }
            persist(&mut store)?;
        }
        Command::AddLayer { name, id } => {
            let order = store.next_layer_order();
            let layer = match id {
                Some(id) => Layer::with_id(id.clone(), name.clone(), order),
                None => Layer::new(name.clone(), order),
            };
            let id = store.add_layer(layer).ok_or_else(|| {
                CliError::Rejected(format!("Layer `{name}` could not be added"))
            })?;
            persist(&mut store)?;
            println!("{id}");
        }
        Command::RemoveLayer { id } => {
            require_layer(&store, id)?;
            if !store.remove_layer(id) {
                return Err(CliError::Rejected(format!("Layer `{id}` cannot be removed")));
            }
            persist(&mut store)?;
        }
        Command::ToggleLayer { id } => {
            let visible = store
                .toggle_layer_visibility(id)
                .ok_or_else(|| CliError::NotFound {
                    kind: "layer",
                    id: id.clone(),
                })?;
            persist(&mut store)?;
            println!("{id}: {}", if visible { "visible" } else { "hidden" });
        }
        Command::Reset => {
            store.reset();
            persist(&mut store)?;
        }
    }

    Ok(())
}

fn persist(store: &mut StateStore) -> CliResult<()> {
    if !store.has_unsaved_changes() {
        debug!("No changes to save");
        return Ok(());
    }
    if store.save() {
        Ok(())
    } else {
        Err(CliError::SaveFailed)
    }
}

fn require_device(store: &StateStore, id: &str) -> CliResult<()> {
    match store.device(id) {
        Some(_) => Ok(()),
        None => Err(CliError::NotFound {
            kind: "device",
            id: id.to_string(),
        }),
    }
}

fn require_layer(store: &StateStore, id: &str) -> CliResult<()> {
    match store.layer(id) {
        Some(_) => Ok(()),
        None => Err(CliError::NotFound {
            kind: "layer",
            id: id.to_string(),
        }),
    }
}

fn add_device(store: &mut StateStore, args: &AddDeviceArgs) -> CliResult<String> {
    if let Some(layer) = &args.layer {
        require_layer(store, layer)?;
    }
    let device_type = args
        .device_type
        .clone()
        .unwrap_or_else(|| store.state().config.default_device_type.clone());
    let layer = args.layer.clone().unwrap_or_default();

    let mut device = match &args.id {
        Some(id) => Device::with_id(id.clone(), device_type, args.x, args.y, layer),
        None => Device::new(device_type, args.x, args.y, layer),
    };
    if let Some(name) = &args.name {
        device = device.named(name.clone());
    }
    store.add_device(device).ok_or_else(|| {
        CliError::Rejected(format!(
            "Device at ({}, {}) could not be added: coordinates must be finite",
            args.x, args.y
        ))
    })
}

fn export(store: &StateStore, file: &Path) -> CliResult<()> {
    let json = store.export_json()?;
    fs::write(file, json).map_err(|source| CliError::Io {
        path: file.to_path_buf(),
        source,
    })?;
    info!("Exported diagram to {}", file.display());
    Ok(())
}

fn import(store: &mut StateStore, file: &Path) -> CliResult<()> {
    let contents = fs::read_to_string(file).map_err(|source| CliError::Io {
        path: file.to_path_buf(),
        source,
    })?;
    let diagram = Diagram::from_json(&contents)?;
    let requested = diagram.connections.len();
    store.load_diagram(diagram);

    let kept = store.state().connections.len();
    if kept < requested {
        warn!(
            "Dropped {} connection(s) with missing endpoints or self-loops",
            requested - kept
        );
    }
    info!("Imported diagram from {}", file.display());
    Ok(())
}

fn print_summary(store: &StateStore) {
    let state = store.state();
    println!("Project: {}", state.project.name);

    println!("Layers ({}):", state.layers.len());
    for layer in state.layers_ordered() {
        let marker = if layer.id == state.current_layer { "*" } else { " " };
        let visibility = if layer.visible { "" } else { " (hidden)" };
        println!(
            " {marker} {:<16} {:<16} {} device(s){visibility}",
            layer.id, layer.name, layer.device_count
        );
    }

    println!("Devices ({}):", state.devices.len());
    for device in state.devices.values() {
        println!(
            "   {:<16} {:<12} ({:.0}, {:.0}) on {} [{:?}]",
            device.id, device.device_type, device.x, device.y, device.layer, device.status
        );
    }

    println!("Connections ({}):", state.connections.len());
    for connection in state.connections.values() {
        println!(
            "   {:<16} {} <-> {} via {}",
            connection.id, connection.device1, connection.device2, connection.medium
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netsketch_core::MemoryStorage;

    fn store() -> StateStore {
        StateStore::new(
            StoreConfig::default().with_auto_save_interval(None),
            Arc::new(MemoryStorage::new()),
        )
    }

    #[test]
    fn test_add_device_uses_default_type_and_current_layer() {
        let mut store = store();
        let args = AddDeviceArgs {
            device_type: None,
            x: 10.0,
            y: 20.0,
            layer: None,
            name: Some("edge".to_string()),
            id: Some("r1".to_string()),
        };
        let id = add_device(&mut store, &args).unwrap();
        assert_eq!(id, "r1");
        let device = store.device("r1").unwrap();
        assert_eq!(device.device_type, "router");
        assert_eq!(device.layer, "default");
        assert_eq!(device.name, "edge");
    }

    #[test]
    fn test_add_device_rejects_unknown_layer() {
        let mut store = store();
        let args = AddDeviceArgs {
            device_type: Some("switch".to_string()),
            x: 0.0,
            y: 0.0,
            layer: Some("nowhere".to_string()),
            name: None,
            id: None,
        };
        assert!(matches!(
            add_device(&mut store, &args),
            Err(CliError::NotFound { kind: "layer", .. })
        ));
    }

    #[test]
    fn test_add_device_rejects_non_finite_coordinates() {
        let mut store = store();
        let args = AddDeviceArgs {
            device_type: None,
            x: f64::NAN,
            y: 0.0,
            layer: None,
            name: None,
            id: Some("r1".to_string()),
        };
        assert!(matches!(
            add_device(&mut store, &args),
            Err(CliError::Rejected(_))
        ));
        assert!(store.device("r1").is_none());
        assert!(!store.has_unsaved_changes());
    }

    #[test]
    fn test_export_then_import() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("diagram.json");

        let mut source = store();
        source.add_device(Device::with_id("a", "router", 0.0, 0.0, "core"));
        source.add_device(Device::with_id("b", "switch", 0.0, 0.0, "access"));
        source.add_connection(Connection::with_id("ab", "a", "b"));
        export(&source, &file).unwrap();

        let mut target = store();
        import(&mut target, &file).unwrap();
        assert_eq!(target.state().devices.len(), 2);
        assert!(target.connection("ab").is_some());
        assert!(target.has_unsaved_changes());
    }

    #[test]
    fn test_import_missing_file() {
        let mut store = store();
        let result = import(&mut store, Path::new("/nonexistent/diagram.json"));
        assert!(matches!(result, Err(CliError::Io { .. })));
    }
}
