//! Availability engine: record store, strategies, orchestration.
//!
//! This crate turns a provider's weekly template plus their bookings (or the
//! busy time of a linked calendar) into bookable slots, and performs booking
//! mutations against the record store with a best-effort mirror to the
//! linked calendar:
//! - [`RecordStore`] gateway with in-memory, file and PostgREST backends
//! - [`Repository`] for typed access to the four collections
//! - [`ManualStrategy`] and [`ExternalStrategy`]
//! - [`Orchestrator`] selecting a strategy per provider
//!
//! # Example
//!
//! ```rust,no_run
//! use slotbook_engine::{EngineConfig, Orchestrator, StoreHandle};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::default();
//!     let handle = StoreHandle::open(&config.store).await?;
//!     let orchestrator = Orchestrator::from_config(handle.store(), &config)?;
//!
//!     let today = chrono::Local::now().date_naive();
//!     let slots = orchestrator.get_available_slots("provider-1", today, today).await?;
//!     println!("{} free slots", slots.len());
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod orchestrator;
pub mod repository;
pub mod store;
pub mod strategy;
#[cfg(test)]
mod testing;

pub use config::{EngineConfig, StoreKind, StoreSettings, default_store_path};
pub use error::{EngineError, EngineResult, StoreError, StoreResult};
pub use orchestrator::{CalendarClients, Orchestrator};
pub use repository::{ProviderProfile, Repository};
pub use store::{MemoryStore, PostgrestStore, RecordStore, StoreHandle};
pub use strategy::{
    AvailabilityStrategy, ExternalStrategy, ExternalSync, ManualStrategy, MutationOutcome,
};
