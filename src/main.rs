use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chime::config::Config;
use chime::presenter::DesktopPlatform;
use chime::service::ReminderService;
use chime::store::Store;

#[derive(Parser, Debug)]
#[command(name = "chime")]
#[command(about = "Run the reminder service with desktop notifications")]
struct Args {
    /// State file path (overrides config and CHIME_STORE)
    #[arg(long)]
    store: Option<PathBuf>,

    /// Disable notification sounds
    #[arg(long)]
    no_sound: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chime=info")),
        )
        .init();

    let args = Args::parse();
    let mut config = Config::load();
    if let Some(store) = args.store {
        config.store_path = store;
    }
    if args.no_sound {
        config.sound_enabled = false;
    }

    let store = Store::load(&config.store_path)?;
    info!(
        path = %config.store_path.display(),
        reminders = store.reminders().len(),
        "store loaded"
    );

    let platform = DesktopPlatform::new(&config);
    let mut service = ReminderService::new(store, Box::new(platform));
    service.run().await;

    Ok(())
}
