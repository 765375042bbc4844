//! Wipes the chime store.
//!
//! Usage: cargo run --bin clear
//!
//! Loads the state file, removes every reminder, todo and project, and writes
//! the emptied state back. The file itself is kept so backups and config keep
//! pointing at the same path.

use anyhow::Result;

use chime::config::Config;
use chime::store::Store;

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let config = Config::load();
    let mut store = Store::load(&config.store_path)?;

    let reminders = store.reminders().len();
    let todos = store.todos().len();
    let projects = store.projects().len();

    store.clear();
    store.save()?;

    println!(
        "Cleared {} reminders, {} todos and {} projects from {}",
        reminders,
        todos,
        projects,
        config.store_path.display()
    );

    Ok(())
}
