//! Engine error types.

use std::io;

use slotbook_providers::ProviderError;
use thiserror::Error;

/// Result type for record store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised by a [`RecordStore`](crate::RecordStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A row that had to exist did not.
    #[error("No matching record in {collection}")]
    NotFound { collection: String },

    /// The query cannot be executed (e.g. an unfiltered delete).
    #[error("Invalid query on {collection}: {message}")]
    Query { collection: String, message: String },

    /// Rows could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error reading or writing a snapshot file.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The backend could not be reached.
    #[error("Store backend error: {message}")]
    Backend { message: String },

    /// The backend answered with a non-success status.
    #[error("Store returned HTTP {status}: {message}")]
    Http { status: u16, message: String },
}

impl StoreError {
    /// Creates a not found error.
    pub fn not_found(collection: impl Into<String>) -> Self {
        Self::NotFound {
            collection: collection.into(),
        }
    }

    /// Creates a query error.
    pub fn query(collection: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Query {
            collection: collection.into(),
            message: message.into(),
        }
    }

    /// Creates a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Errors surfaced by strategies and the orchestrator.
///
/// Only failures of internal state show up here; external calendar failures
/// are logged and absorbed by the strategies.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Record store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The caller supplied an invalid payload.
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// The targeted record does not exist for this provider.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// External calendar failure that could not be absorbed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A stored row did not match the expected shape.
    #[error("Malformed record: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl EngineError {
    /// Creates an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a not found error for an appointment.
    pub fn appointment_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "Appointment",
            id: id.into(),
        }
    }

    /// Creates a not found error for an availability window.
    pub fn window_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "Availability window",
            id: id.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns true for errors caused by the caller rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput { .. } | Self::NotFound { .. })
    }
}
