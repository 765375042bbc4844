//! Backup binary for copying the chime store to a backup file.
//!
//! Usage: cargo run --bin backup
//!        cargo run --bin backup -- --target my_backup.json
//!        cargo run --bin backup -- --store other.json --target backup.json
//!
//! Validates the source blob before copying so a corrupt file is never
//! silently duplicated.

use anyhow::{Context, Result};
use chrono::Datelike;
use clap::Parser;
use std::fs;
use std::path::PathBuf;

use chime::config::Config;
use chime::store::Store;

#[derive(Parser, Debug)]
#[command(name = "backup")]
#[command(about = "Backup the chime store to a new file")]
struct Args {
    /// Source store path (overrides CHIME_STORE from .env)
    #[arg(long)]
    store: Option<PathBuf>,

    /// Target backup file path (default: backup_{year}_{month}_{day}.json)
    #[arg(long)]
    target: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _ = dotenvy::dotenv();

    let mut config = Config::load();
    if let Some(store) = args.store {
        config.store_path = store;
    }

    let now = chrono::Local::now();
    let default_target = PathBuf::from(format!(
        "backup_{}_{:02}_{:02}.json",
        now.year(),
        now.month(),
        now.day()
    ));
    let target = args.target.unwrap_or(default_target);

    println!("Source store: {}", config.store_path.display());
    println!("Target backup: {}", target.display());

    // Parse before copying. A blob that fails to load is not worth backing up.
    let store = Store::load(&config.store_path)?;
    println!(
        "  {} reminders, {} todos, {} projects",
        store.reminders().len(),
        store.todos().len(),
        store.projects().len()
    );

    if config.store_path.exists() {
        fs::copy(&config.store_path, &target)
            .with_context(|| format!("could not copy to {}", target.display()))?;
    } else {
        // Nothing on disk yet. Write an empty but valid state file so the
        // backup is restorable.
        Store::load(&target)?.save()?;
    }

    println!("\nBackup completed successfully!");
    println!("Backup saved to: {}", target.display());

    Ok(())
}
