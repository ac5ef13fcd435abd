//! NetSketch command-line front end.

use clap::Parser;

mod cli;
mod commands;
mod error;

use crate::cli::Cli;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(error) = commands::run(&cli) {
        log::debug!("Command failed: {error:?}");
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

/// Initialize `env_logger`. `RUST_LOG` takes precedence over `-v` flags.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}
