use core_types::TieBreak;
use serde::Deserialize;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
///
/// Every section is optional; a missing `config.toml` yields the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub router: RouterSettings,
    #[serde(default)]
    pub logging: Logging,
}

/// Where exchange snapshots are loaded from and persisted to.
#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
    /// Directory holding one `<exchange id>.json` file per exchange.
    #[serde(default = "default_exchanges_dir")]
    pub exchanges_dir: PathBuf,
    /// Pretty-print persisted snapshots.
    #[serde(default = "default_true")]
    pub pretty: bool,
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            exchanges_dir: default_exchanges_dir(),
            pretty: true,
        }
    }
}

/// Parameters of the best-execution router.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RouterSettings {
    /// Ordering of candidates quoted at the same price.
    #[serde(default)]
    pub tie_break: TieBreak,
}

/// Log output settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Logging {
    /// Filter directive used when `RUST_LOG` is not set (e.g. "info" or "router=debug").
    #[serde(default = "default_level")]
    pub level: String,
    /// When set, logs are also written to a daily-rolling file in this directory.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: default_level(),
            directory: None,
            file_prefix: default_file_prefix(),
        }
    }
}

fn default_exchanges_dir() -> PathBuf {
    PathBuf::from("exchanges")
}

fn default_true() -> bool {
    true
}

fn default_level() -> String {
    "info".to_string()
}

fn default_file_prefix() -> String {
    "meta-exchange.log".to_string()
}
