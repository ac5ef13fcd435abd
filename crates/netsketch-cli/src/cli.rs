//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "netsketch",
    version,
    about = "Inspect and edit saved NetSketch network diagrams",
    long_about = "Inspect and edit the network diagram saved by NetSketch.\n\n\
                  Every editing command loads the saved state, applies one change \
                  and writes the state back."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG wins when set.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Directory holding the saved state (default: platform data directory).
    #[arg(long = "data-dir", value_name = "DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Storage key of the saved state.
    #[arg(long = "key", value_name = "KEY", global = true)]
    pub key: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print devices, connections and layers of the saved diagram.
    Summary,

    /// Print the value at a dotted key-path, e.g. `canvas.zoom`.
    Get {
        #[arg(value_name = "PATH")]
        path: String,
    },

    /// Write the diagram (devices, connections, layers) to a JSON file.
    Export {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Replace the diagram with the contents of a JSON file.
    Import {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Add a device.
    AddDevice(AddDeviceArgs),

    /// Move a device to new canvas coordinates.
    MoveDevice {
        id: String,
        x: f64,
        y: f64,
    },

    /// Remove a device and its connections.
    RemoveDevice { id: String },

    /// Connect two devices.
    Connect {
        device1: String,
        device2: String,
        /// Link medium, e.g. `ethernet` or `fiber`.
        #[arg(long)]
        medium: Option<String>,
        #[arg(long)]
        id: Option<String>,
    },

    /// Remove a connection.
    Disconnect { id: String },

    /// Add a layer on top of the existing ones.
    AddLayer {
        name: String,
        #[arg(long)]
        id: Option<String>,
    },

    /// Remove a layer. Its devices move to the default layer.
    RemoveLayer { id: String },

    /// Show or hide a layer.
    ToggleLayer { id: String },

    /// Discard the saved diagram and start over.
    Reset,
}

#[derive(Parser)]
pub struct AddDeviceArgs {
    /// Device type, e.g. `router`, `switch`, `firewall`.
    #[arg(long = "type", value_name = "TYPE")]
    pub device_type: Option<String>,

    #[arg(long, default_value_t = 0.0)]
    pub x: f64,

    #[arg(long, default_value_t = 0.0)]
    pub y: f64,

    /// Target layer (default: the current layer).
    #[arg(long)]
    pub layer: Option<String>,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub id: Option<String>,
}
