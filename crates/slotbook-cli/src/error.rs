//! CLI error types.

use std::fmt;

use slotbook_engine::EngineError;

use crate::secret::SecretError;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI.
#[derive(Debug)]
pub enum CliError {
    /// Configuration error.
    Config(String),
    /// Secret reference could not be resolved.
    Secret(SecretError),
    /// Engine or store error.
    Engine(EngineError),
    /// IO error.
    Io(std::io::Error),
    /// The engine declined the operation.
    Rejected(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Secret(err) => write!(f, "secret error: {}", err),
            Self::Engine(err) => write!(f, "{}", err),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Rejected(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Secret(err) => Some(err),
            Self::Engine(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<EngineError> for CliError {
    fn from(err: EngineError) -> Self {
        Self::Engine(err)
    }
}

impl From<SecretError> for CliError {
    fn from(err: SecretError) -> Self {
        Self::Secret(err)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::Engine(EngineError::Serialization(err))
    }
}
