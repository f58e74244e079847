mod cli;
mod config;
mod identity;
mod model;
mod roster;
mod session;
mod stats;
mod storage;
mod tool;

use std::process;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use storage::Storage;

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env("EPS_LOG").unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let Some(root) = config.data_dir.clone().or_else(Storage::default_root) else {
        eprintln!("Could not determine home directory.");
        process::exit(1);
    };

    let storage = match Storage::new(root) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to initialize storage: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = cli::run(&config, &storage) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
