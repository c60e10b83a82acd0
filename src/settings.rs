//! Settings loaded from a TOML file with `STATWATCH__` environment overrides.
//!
//! ```toml
//! [host]
//! export_file = "host-export.json"
//! game_data_file = "game-data.json"
//! cache_dir = "cache"
//! interval_secs = 60
//!
//! [statistics]
//! auto_enroll_characters = true
//!
//! [statistics.server]
//! enabled = true
//! type = "influxdb"
//! server = "http://localhost:8086"
//! token = "..."
//! organization = "home"
//! bucket = "game"
//!
//! [[statistics.included_inventory_filters]]
//! name = "crystals"
//! ```
//!
//! Any key can be overridden from the environment, e.g.
//! `STATWATCH__STATISTICS__SERVER__TOKEN=...`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use statwatch_sdk::Configuration;

/// Environment prefix for overrides.
pub const ENV_PREFIX: &str = "STATWATCH";

/// Where the host writes its data, and how often to publish.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HostSettings {
    /// JSON export polled for game state.
    pub export_file: PathBuf,
    /// JSON sheets with class jobs, items and worlds.
    pub game_data_file: PathBuf,
    /// Directory holding the `l.*.json` and `f.*.json` caches.
    pub cache_dir: PathBuf,
    pub interval_secs: u64,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            export_file: PathBuf::from("host-export.json"),
            game_data_file: PathBuf::from("game-data.json"),
            cache_dir: PathBuf::from("cache"),
            interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub host: HostSettings,
    pub statistics: Configuration,
}

impl Settings {
    /// Load from an optional file plus the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::build(path, Environment::with_prefix(ENV_PREFIX))
    }

    fn build(path: Option<&Path>, environment: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        builder
            .add_source(environment.separator("__").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Time between cycles, never shorter than a second.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.host.interval_secs.max(1))
    }
}
