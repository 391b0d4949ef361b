//! Command implementations.

pub mod availability;
pub mod bookings;
pub mod config;
pub mod provider;

use std::sync::Arc;

use tracing::debug;

use slotbook_engine::{EngineConfig, Orchestrator, RecordStore, StoreHandle};

use crate::error::CliResult;
use crate::render::OutputFormat;

/// An opened store plus the orchestrator running on it.
pub struct Session {
    handle: StoreHandle,
    orchestrator: Orchestrator,
    pub format: OutputFormat,
}

impl Session {
    /// Opens the configured store and builds the orchestrator with real
    /// calendar clients.
    pub async fn open(config: &EngineConfig, format: OutputFormat) -> CliResult<Self> {
        let handle = StoreHandle::open(&config.store).await?;
        let orchestrator = Orchestrator::from_config(handle.store(), config)?;
        debug!(store = ?config.store.kind, "session opened");
        Ok(Self {
            handle,
            orchestrator,
            format,
        })
    }

    /// A session over an existing store, with the given orchestrator.
    pub fn with_orchestrator(
        store: Arc<dyn RecordStore>,
        orchestrator: Orchestrator,
        format: OutputFormat,
    ) -> Self {
        Self {
            handle: StoreHandle::from_store(store),
            orchestrator,
            format,
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Writes pending changes back; a no-op for stores that persist on
    /// every write.
    pub async fn save(&self) -> CliResult<()> {
        self.handle.persist().await?;
        Ok(())
    }
}
