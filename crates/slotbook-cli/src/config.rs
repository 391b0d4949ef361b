//! CLI configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/slotbook/config.toml` by default:
//!
//! ```toml
//! [engine]
//! external_timeout_secs = 10
//!
//! [engine.store]
//! kind = "postgrest"
//! url = "https://project.example.co"
//! api_key = "env::SLOTBOOK_API_KEY"
//! ```
//!
//! The store `api_key` supports secret references (see [`crate::secret`]).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use slotbook_engine::EngineConfig;

use crate::error::{CliError, CliResult};
use crate::secret;

/// Configuration for the slotbook CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Debug mode.
    pub debug: bool,

    /// Engine and record store settings.
    pub engine: EngineConfig,
}

impl CliConfig {
    /// Loads configuration from the default path, or defaults if the file
    /// does not exist.
    pub fn load() -> CliResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> CliResult<Self> {
        toml::from_str(content)
            .map_err(|e| CliError::Config(format!("failed to parse config: {}", e)))
    }

    /// Engine settings with secret references expanded.
    pub fn resolved_engine(&self) -> CliResult<EngineConfig> {
        let mut engine = self.engine.clone();
        engine.store.api_key = secret::resolve_opt(engine.store.api_key.as_deref())?;
        Ok(engine)
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("slotbook")
    }
}
