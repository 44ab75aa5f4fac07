//! Geoimport CLI
//!
//! Streams a geolocation CSV file into the record store and prints a run
//! summary.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- data.csv config.json
//! ```
//!
//! The config file is optional; without it the importer uses four save
//! workers and a `geodata.db` SQLite file in the working directory.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `warn` to control logging verbosity

use geoimport::{run_import, ImportConfig, ImportError, Result, SqliteStore};
use std::env;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use std::process;

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        return Err(ImportError::MissingArgument);
    }

    let input_path = &args[1];
    let config = match args.get(2) {
        Some(path) => ImportConfig::from_file(Path::new(path))?,
        None => ImportConfig::default(),
    };

    let file = File::open(input_path)?;
    let reader = BufReader::new(file);

    let store = SqliteStore::open(&config.store.path, config.store.busy_timeout())?;
    let analytics = run_import(reader, &store, config.workers);

    let stdout = io::stdout();
    let handle = stdout.lock();
    analytics.write_summary(handle)?;

    Ok(())
}
