//! Internal-only availability.

use tracing::{debug, info};

use slotbook_core::{
    Appointment, AppointmentRequest, AppointmentUpdate, AvailabilitySlot, DateRange,
    IntegrationMode, WeeklyAvailabilityWindow, WindowInput, compute_slots,
};
use slotbook_providers::BoxFuture;

use super::{AvailabilityStrategy, MutationOutcome};
use crate::error::{EngineError, EngineResult};
use crate::repository::Repository;

/// Availability computed from the weekly template and internal bookings.
///
/// Every other strategy falls back to this one, and all of them commit
/// their mutations through it first.
#[derive(Clone)]
pub struct ManualStrategy {
    repo: Repository,
}

impl ManualStrategy {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// Free windows in `range`, blocked by internal bookings only.
    pub async fn available_slots(
        &self,
        provider_id: &str,
        range: DateRange,
    ) -> EngineResult<Vec<AvailabilitySlot>> {
        if range.is_empty() {
            return Ok(Vec::new());
        }
        let windows = self.repo.weekly_windows(provider_id).await?;
        let busy: Vec<_> = self
            .repo
            .scheduled_appointments(provider_id, range)
            .await?
            .iter()
            .map(Appointment::interval)
            .collect();

        let slots = compute_slots(&windows, &busy, range);
        debug!(
            provider_id,
            windows = windows.len(),
            bookings = busy.len(),
            slots = slots.len(),
            "computed manual slots"
        );
        Ok(slots)
    }

    pub async fn weekly_windows(
        &self,
        provider_id: &str,
    ) -> EngineResult<Vec<WeeklyAvailabilityWindow>> {
        self.repo.weekly_windows(provider_id).await
    }

    /// Inserts the appointment with status `scheduled`.
    ///
    /// Overlap with existing bookings is not checked.
    pub async fn create(&self, request: &AppointmentRequest) -> EngineResult<Appointment> {
        request.validate().map_err(EngineError::invalid_input)?;
        let appointment = self.repo.insert_appointment(request).await?;
        info!(
            provider_id = %appointment.provider_id,
            appointment_id = %appointment.id,
            "appointment created"
        );
        Ok(appointment)
    }

    pub async fn update(
        &self,
        appointment_id: &str,
        provider_id: &str,
        update: &AppointmentUpdate,
    ) -> EngineResult<Appointment> {
        update.validate().map_err(EngineError::invalid_input)?;
        let appointment = self
            .repo
            .update_appointment(appointment_id, provider_id, update)
            .await?
            .ok_or_else(|| EngineError::appointment_not_found(appointment_id))?;
        info!(provider_id, appointment_id, "appointment updated");
        Ok(appointment)
    }

    /// Marks the appointment cancelled. Cancelling twice is not an error.
    pub async fn cancel(
        &self,
        appointment_id: &str,
        provider_id: &str,
    ) -> EngineResult<Appointment> {
        let appointment = self
            .repo
            .cancel_appointment(appointment_id, provider_id)
            .await?
            .ok_or_else(|| EngineError::appointment_not_found(appointment_id))?;
        info!(provider_id, appointment_id, "appointment cancelled");
        Ok(appointment)
    }

    /// Adds a window to the provider's weekly template.
    pub async fn save_window(
        &self,
        provider_id: &str,
        input: &WindowInput,
    ) -> EngineResult<WeeklyAvailabilityWindow> {
        input.validate().map_err(EngineError::invalid_input)?;
        let window = self.repo.insert_window(provider_id, input).await?;
        info!(provider_id, window_id = %window.id, day = window.day_of_week, "window saved");
        Ok(window)
    }

    /// Removes a window from the provider's weekly template.
    pub async fn delete_window(&self, provider_id: &str, window_id: &str) -> EngineResult<()> {
        if !self.repo.delete_window(provider_id, window_id).await? {
            return Err(EngineError::window_not_found(window_id));
        }
        info!(provider_id, window_id, "window deleted");
        Ok(())
    }
}

impl AvailabilityStrategy for ManualStrategy {
    fn mode(&self) -> IntegrationMode {
        IntegrationMode::Manual
    }

    fn get_available_slots<'a>(
        &'a self,
        provider_id: &'a str,
        range: DateRange,
    ) -> BoxFuture<'a, EngineResult<Vec<AvailabilitySlot>>> {
        Box::pin(self.available_slots(provider_id, range))
    }

    fn create_appointment<'a>(
        &'a self,
        request: &'a AppointmentRequest,
    ) -> BoxFuture<'a, EngineResult<MutationOutcome>> {
        Box::pin(async move { self.create(request).await.map(MutationOutcome::internal_only) })
    }

    fn update_appointment<'a>(
        &'a self,
        appointment_id: &'a str,
        provider_id: &'a str,
        update: &'a AppointmentUpdate,
    ) -> BoxFuture<'a, EngineResult<MutationOutcome>> {
        Box::pin(async move {
            self.update(appointment_id, provider_id, update)
                .await
                .map(MutationOutcome::internal_only)
        })
    }

    fn cancel_appointment<'a>(
        &'a self,
        appointment_id: &'a str,
        provider_id: &'a str,
    ) -> BoxFuture<'a, EngineResult<MutationOutcome>> {
        Box::pin(async move {
            self.cancel(appointment_id, provider_id)
                .await
                .map(MutationOutcome::internal_only)
        })
    }

    fn get_expert_availability<'a>(
        &'a self,
        provider_id: &'a str,
    ) -> BoxFuture<'a, EngineResult<Vec<WeeklyAvailabilityWindow>>> {
        Box::pin(self.weekly_windows(provider_id))
    }
}
