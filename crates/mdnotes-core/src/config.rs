//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/mdnotes/config.toml)
//! 3. Environment variables (MDNOTES_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::render::RenderOptions;
use crate::session::SwitchPolicy;
use crate::storage::{DynStorage, FileBackend, KvBackend, MemoryBackend, SqliteBackend, Storage};

/// Environment variable prefix
const ENV_PREFIX: &str = "MDNOTES";

/// Which key-value medium holds the notes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// One JSON file per key in `data_dir`
    #[default]
    File,
    /// A SQLite database in `data_dir`
    Sqlite,
    /// Nothing survives the process
    Memory,
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "file" => Ok(BackendKind::File),
            "sqlite" => Ok(BackendKind::Sqlite),
            "memory" => Ok(BackendKind::Memory),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for note storage
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Storage backend
    #[serde(default)]
    pub backend: BackendKind,

    /// Idle time before an edit is auto-saved, in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// What to do with unsaved edits when switching notes
    #[serde(default)]
    pub switch_policy: SwitchPolicy,

    /// Optional log file; logs go to stderr when unset
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Preview rendering options
    #[serde(default)]
    pub render: RenderOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backend: BackendKind::default(),
            debounce_ms: default_debounce_ms(),
            switch_policy: SwitchPolicy::default(),
            log_file: None,
            render: RenderOptions::default(),
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (MDNOTES_DATA_DIR, MDNOTES_BACKEND,
    ///    MDNOTES_DEBOUNCE_MS, MDNOTES_SWITCH_POLICY)
    /// 2. Config file (~/.config/mdnotes/config.toml or MDNOTES_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // MDNOTES_DATA_DIR
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // MDNOTES_BACKEND
        if let Ok(val) = std::env::var(format!("{}_BACKEND", ENV_PREFIX)) {
            match val.parse() {
                Ok(kind) => self.backend = kind,
                Err(e) => warn!("Ignoring {}_BACKEND: {}", ENV_PREFIX, e),
            }
        }

        // MDNOTES_DEBOUNCE_MS
        if let Ok(val) = std::env::var(format!("{}_DEBOUNCE_MS", ENV_PREFIX)) {
            match val.trim().parse() {
                Ok(ms) => self.debounce_ms = ms,
                Err(e) => warn!("Ignoring {}_DEBOUNCE_MS: {}", ENV_PREFIX, e),
            }
        }

        // MDNOTES_SWITCH_POLICY
        if let Ok(val) = std::env::var(format!("{}_SWITCH_POLICY", ENV_PREFIX)) {
            match val.parse() {
                Ok(policy) => self.switch_policy = policy,
                Err(e) => warn!("Ignoring {}_SWITCH_POLICY: {}", ENV_PREFIX, e),
            }
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_file_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with MDNOTES_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mdnotes")
            .join("config.toml")
    }

    /// Get the path to the SQLite database
    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join("mdnotes.db")
    }

    /// Debounce window as a duration
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Open the configured storage backend
    pub fn open_storage(&self) -> Result<DynStorage> {
        let backend: Box<dyn KvBackend> = match self.backend {
            BackendKind::File => Box::new(
                FileBackend::open(&self.data_dir)
                    .with_context(|| format!("Failed to open data directory {:?}", self.data_dir))?,
            ),
            BackendKind::Sqlite => {
                let path = self.sqlite_path();
                Box::new(
                    SqliteBackend::open(&path)
                        .with_context(|| format!("Failed to open SQLite database at {:?}", path))?,
                )
            }
            BackendKind::Memory => Box::new(MemoryBackend::new()),
        };
        Ok(Storage::new(backend))
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mdnotes")
}

fn default_debounce_ms() -> u64 {
    500
}
