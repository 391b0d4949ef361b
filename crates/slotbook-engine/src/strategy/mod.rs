//! Availability strategies.
//!
//! A strategy answers slot queries and performs booking mutations for one
//! integration mode. [`ManualStrategy`] works purely on the record store;
//! [`ExternalStrategy`] layers a remote calendar on top of it.

mod external;
mod manual;

use std::fmt;

use slotbook_core::{
    Appointment, AppointmentRequest, AppointmentUpdate, AvailabilitySlot, DateRange,
    IntegrationMode, WeeklyAvailabilityWindow,
};
use slotbook_providers::BoxFuture;

use crate::error::EngineResult;

pub use external::ExternalStrategy;
pub use manual::ManualStrategy;

/// What happened to the remote mirror of a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalSync {
    /// The strategy has no remote calendar, or the provider has no usable
    /// credentials for it.
    NotConfigured,
    /// The record has no remote event to propagate to.
    Skipped,
    /// The remote calendar accepted the change.
    Synced,
    /// The remote call failed; the internal change stands.
    Failed(String),
}

impl ExternalSync {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for ExternalSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConfigured => write!(f, "not configured"),
            Self::Skipped => write!(f, "skipped"),
            Self::Synced => write!(f, "synced"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Result of a booking mutation.
///
/// The internal record is authoritative: a mutation that returns an outcome
/// has been committed to the store, whatever `external` says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOutcome {
    /// The appointment as stored after the mutation.
    pub internal: Appointment,
    pub external: ExternalSync,
}

impl MutationOutcome {
    pub fn new(internal: Appointment, external: ExternalSync) -> Self {
        Self { internal, external }
    }

    /// An outcome with no remote calendar involved.
    pub fn internal_only(internal: Appointment) -> Self {
        Self::new(internal, ExternalSync::NotConfigured)
    }
}

/// Slot computation and booking mutations for one integration mode.
pub trait AvailabilityStrategy: Send + Sync {
    /// The integration mode this strategy serves.
    fn mode(&self) -> IntegrationMode;

    /// Free whole windows between `range.start` and `range.end`, inclusive,
    /// ordered by date then start time.
    fn get_available_slots<'a>(
        &'a self,
        provider_id: &'a str,
        range: DateRange,
    ) -> BoxFuture<'a, EngineResult<Vec<AvailabilitySlot>>>;

    /// Creates an appointment.
    fn create_appointment<'a>(
        &'a self,
        request: &'a AppointmentRequest,
    ) -> BoxFuture<'a, EngineResult<MutationOutcome>>;

    /// Applies a partial update to an appointment of `provider_id`.
    fn update_appointment<'a>(
        &'a self,
        appointment_id: &'a str,
        provider_id: &'a str,
        update: &'a AppointmentUpdate,
    ) -> BoxFuture<'a, EngineResult<MutationOutcome>>;

    /// Cancels an appointment of `provider_id`.
    fn cancel_appointment<'a>(
        &'a self,
        appointment_id: &'a str,
        provider_id: &'a str,
    ) -> BoxFuture<'a, EngineResult<MutationOutcome>>;

    /// The provider's weekly template, ordered by day then start time.
    fn get_expert_availability<'a>(
        &'a self,
        provider_id: &'a str,
    ) -> BoxFuture<'a, EngineResult<Vec<WeeklyAvailabilityWindow>>>;
}
