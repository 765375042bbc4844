use std::path::PathBuf;

use serde::Deserialize;

/// Maximum number of simultaneously visible notifications. Insertion beyond
/// this evicts the oldest entry first.
pub const MAX_ACTIVE_NOTIFICATIONS: usize = 10;

/// How long an OS-level notification stays up before auto-dismissing.
pub const NOTIFICATION_TIMEOUT_MS: u32 = 30_000;

/// Period of the backup sweep that catches reminders whose primary timer
/// never fired.
pub const SWEEP_INTERVAL_MS: u64 = 60_000;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path of the persisted state blob.
    pub store_path: PathBuf,
    /// Whether to attempt notification sounds at all.
    pub sound_enabled: bool,
    /// Optional override for the sound file; otherwise a few well-known
    /// system sounds are probed.
    pub sound_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("chime.json"),
            sound_enabled: true,
            sound_file: None,
        }
    }
}

impl Config {
    /// Load configuration from `chime.toml` (or `$CHIME_CONFIG`), falling back
    /// to defaults when the file is absent or invalid. Environment variables
    /// override the file.
    pub fn load() -> Config {
        let path = std::env::var("CHIME_CONFIG").unwrap_or_else(|_| "chime.toml".to_string());

        let mut config = match std::fs::read_to_string(&path) {
            Ok(contents) => Config::parse_or_default(&contents, &path),
            Err(_) => Config::default(),
        };

        if let Ok(store) = std::env::var("CHIME_STORE") {
            config.store_path = PathBuf::from(store);
        }
        if let Ok(sound) = std::env::var("CHIME_SOUND") {
            config.sound_enabled = sound != "0" && sound.to_lowercase() != "false";
        }

        config
    }

    /// Parse file contents, falling back to defaults on error. The warning
    /// goes to stderr so it shows up in the utility binaries too, which never
    /// install a tracing subscriber.
    fn parse_or_default(contents: &str, path: &str) -> Config {
        toml::from_str(contents).unwrap_or_else(|e| {
            eprintln!("invalid config file '{}': {}, using defaults", path, e);
            Config::default()
        })
    }
}
