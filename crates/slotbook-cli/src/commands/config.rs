//! Configuration commands.

use std::path::Path;

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};

/// The configuration as TOML, with secret references left unresolved.
pub fn dump(config: &CliConfig, path: &Path) -> CliResult<String> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| CliError::Config(format!("failed to serialize config: {}", e)))?;
    Ok(format!("# config.toml ({})\n{}", path.display(), toml_str.trim_end()))
}

/// The configuration file and record store locations.
pub fn path(config: &CliConfig, path: &Path) -> CliResult<String> {
    let store = &config.engine.store;
    let location = match store.url {
        Some(ref url) if store.kind == slotbook_engine::StoreKind::Postgrest => url.clone(),
        _ => store.snapshot_path().display().to_string(),
    };
    Ok(format!("config: {}\nstore: {}", path.display(), location))
}
