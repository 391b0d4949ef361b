//! Engine configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use slotbook_providers::{DEFAULT_TIMEOUT, calendly, google, office365};

/// Which record store backend to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// In-memory store snapshotted to a JSON file.
    #[default]
    File,
    /// In-memory store that is never persisted.
    Memory,
    /// Hosted database behind PostgREST.
    Postgrest,
}

/// Record store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub kind: StoreKind,
    /// Snapshot file for the `file` store.
    pub path: Option<PathBuf>,
    /// Project URL for the `postgrest` store.
    pub url: Option<String>,
    /// API key for the `postgrest` store.
    pub api_key: Option<String>,
    /// Request timeout for the `postgrest` store, in seconds.
    pub timeout_secs: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            kind: StoreKind::File,
            path: None,
            url: None,
            api_key: None,
            timeout_secs: 10,
        }
    }
}

impl StoreSettings {
    /// Settings for a file store at `path`.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: StoreKind::File,
            path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Settings for a PostgREST store.
    pub fn postgrest(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            kind: StoreKind::Postgrest,
            url: Some(url.into()),
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }

    /// The snapshot file, defaulting to `slotbook/store.json` under the
    /// user's data directory.
    pub fn snapshot_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(default_store_path)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Returns the default snapshot path.
///
/// Uses `$XDG_DATA_HOME/slotbook/store.json` (or the platform equivalent),
/// falling back to the current directory.
pub fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("slotbook"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("store.json")
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on every external calendar call, in seconds.
    pub external_timeout_secs: u64,
    pub google_api_base: String,
    pub graph_api_base: String,
    pub calendly_api_base: String,
    pub store: StoreSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            external_timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            google_api_base: google::CALENDAR_API_BASE.to_string(),
            graph_api_base: office365::GRAPH_API_BASE.to_string(),
            calendly_api_base: calendly::CALENDLY_API_BASE.to_string(),
            store: StoreSettings::default(),
        }
    }
}

impl EngineConfig {
    /// Builder: set the external call timeout.
    pub fn with_external_timeout(mut self, timeout: Duration) -> Self {
        self.external_timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// Builder: set the store settings.
    pub fn with_store(mut self, store: StoreSettings) -> Self {
        self.store = store;
        self
    }

    /// The bound applied to each external call.
    pub fn external_timeout(&self) -> Duration {
        Duration::from_secs(self.external_timeout_secs.max(1))
    }
}
