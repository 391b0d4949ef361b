//! Availability backed by a remote calendar.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use slotbook_core::{
    Appointment, AppointmentRequest, AppointmentUpdate, AvailabilitySlot, DateRange,
    IntegrationMode, WeeklyAvailabilityWindow, compute_slots,
};
use slotbook_providers::{
    BoxFuture, CalendarClient, CalendarCredentials, ProviderError, ProviderResult,
};

use super::{AvailabilityStrategy, ExternalSync, ManualStrategy, MutationOutcome};
use crate::error::EngineResult;

/// Strategy for Google Calendar, Microsoft 365 and Calendly.
///
/// Slots use the weekly template with the remote calendar's busy time in
/// place of internal bookings. Whenever the remote side cannot be used
/// (no credentials, failure, timeout) the manual result is returned
/// instead. Mutations always go to the record store first; the remote
/// mirror is best effort and its failures are only logged.
#[derive(Clone)]
pub struct ExternalStrategy {
    mode: IntegrationMode,
    client: Arc<dyn CalendarClient>,
    manual: ManualStrategy,
    timeout: Duration,
}

impl ExternalStrategy {
    pub fn new(
        mode: IntegrationMode,
        client: Arc<dyn CalendarClient>,
        manual: ManualStrategy,
        timeout: Duration,
    ) -> Self {
        Self {
            mode,
            client,
            manual,
            timeout,
        }
    }

    /// Usable credentials, or `None` when the provider has not linked this
    /// calendar.
    async fn credentials(&self, provider_id: &str) -> EngineResult<Option<CalendarCredentials>> {
        let Some(credentials) = self
            .manual
            .repository()
            .credentials(provider_id, self.mode)
            .await?
        else {
            return Ok(None);
        };
        self.client.check_credentials(&credentials)?;
        Ok(Some(credentials))
    }

    /// Runs one remote call under the configured deadline.
    async fn call<T>(
        &self,
        operation: &'static str,
        future: impl Future<Output = ProviderResult<T>>,
    ) -> ProviderResult<T> {
        match tokio::time::timeout(self.timeout, future).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::timeout(format!(
                "{} exceeded {}s",
                operation,
                self.timeout.as_secs()
            ))
            .with_provider(self.client.name())),
        }
    }

    /// Slots from the remote busy time; `None` when no credentials exist.
    async fn remote_slots(
        &self,
        provider_id: &str,
        range: DateRange,
    ) -> EngineResult<Option<Vec<AvailabilitySlot>>> {
        let Some(credentials) = self.credentials(provider_id).await? else {
            return Ok(None);
        };
        let windows = self.manual.weekly_windows(provider_id).await?;
        let busy = self
            .call(
                "busy-time fetch",
                self.client.fetch_busy_intervals(&credentials, range),
            )
            .await?;

        let slots = compute_slots(&windows, &busy, range);
        debug!(
            provider_id,
            mode = %self.mode,
            busy = busy.len(),
            slots = slots.len(),
            "computed slots from remote busy time"
        );
        Ok(Some(slots))
    }

    async fn available_slots(
        &self,
        provider_id: &str,
        range: DateRange,
    ) -> EngineResult<Vec<AvailabilitySlot>> {
        if range.is_empty() {
            return Ok(Vec::new());
        }
        match self.remote_slots(provider_id, range).await {
            Ok(Some(slots)) => Ok(slots),
            Ok(None) => {
                debug!(
                    provider_id,
                    mode = %self.mode,
                    "no calendar credentials, using manual slots"
                );
                self.manual.available_slots(provider_id, range).await
            }
            Err(e) => {
                warn!(
                    provider_id,
                    mode = %self.mode,
                    error = %e,
                    "remote availability failed, falling back to manual"
                );
                self.manual.available_slots(provider_id, range).await
            }
        }
    }

    /// Credentials for a mirror step. Lookup failures become a failed sync
    /// instead of an error, since the internal write already happened.
    async fn mirror_credentials(
        &self,
        provider_id: &str,
    ) -> Result<CalendarCredentials, ExternalSync> {
        match self.credentials(provider_id).await {
            Ok(Some(credentials)) => Ok(credentials),
            Ok(None) => Err(ExternalSync::NotConfigured),
            Err(e) => {
                warn!(
                    provider_id,
                    mode = %self.mode,
                    error = %e,
                    "cannot load calendar credentials"
                );
                Err(ExternalSync::Failed(e.to_string()))
            }
        }
    }

    async fn create(&self, request: &AppointmentRequest) -> EngineResult<MutationOutcome> {
        let appointment = self.manual.create(request).await?;
        let credentials = match self.mirror_credentials(&request.provider_id).await {
            Ok(credentials) => credentials,
            Err(sync) => return Ok(MutationOutcome::new(appointment, sync)),
        };

        let created = self
            .call(
                "event create",
                self.client.create_event(&credentials, request),
            )
            .await;
        let event_id = match created {
            Ok(Some(event_id)) => event_id,
            Ok(None) => {
                debug!(appointment_id = %appointment.id, "remote event created without an id");
                return Ok(MutationOutcome::new(appointment, ExternalSync::Synced));
            }
            Err(e) => return Ok(self.mirror_failed(appointment, "create", e)),
        };

        match self
            .manual
            .repository()
            .set_external_event_id(&appointment.id, &appointment.provider_id, &event_id)
            .await
        {
            Ok(Some(linked)) => Ok(MutationOutcome::new(linked, ExternalSync::Synced)),
            Ok(None) => Ok(MutationOutcome::new(appointment, ExternalSync::Synced)),
            Err(e) => {
                warn!(
                    appointment_id = %appointment.id,
                    event_id = %event_id,
                    error = %e,
                    "remote event created but its id could not be stored"
                );
                Ok(MutationOutcome::new(appointment, ExternalSync::Failed(e.to_string())))
            }
        }
    }

    async fn update(
        &self,
        appointment_id: &str,
        provider_id: &str,
        update: &AppointmentUpdate,
    ) -> EngineResult<MutationOutcome> {
        let appointment = self.manual.update(appointment_id, provider_id, update).await?;
        let Some(event_id) = appointment.external_event_id.clone() else {
            return Ok(MutationOutcome::new(appointment, ExternalSync::Skipped));
        };
        let credentials = match self.mirror_credentials(provider_id).await {
            Ok(credentials) => credentials,
            Err(sync) => return Ok(MutationOutcome::new(appointment, sync)),
        };

        let result = self
            .call(
                "event update",
                self.client
                    .update_event(&credentials, &event_id, update, &appointment),
            )
            .await;
        Ok(self.mirror_result(appointment, "update", result))
    }

    async fn cancel(
        &self,
        appointment_id: &str,
        provider_id: &str,
    ) -> EngineResult<MutationOutcome> {
        let appointment = self.manual.cancel(appointment_id, provider_id).await?;
        let Some(event_id) = appointment.external_event_id.clone() else {
            return Ok(MutationOutcome::new(appointment, ExternalSync::Skipped));
        };
        let credentials = match self.mirror_credentials(provider_id).await {
            Ok(credentials) => credentials,
            Err(sync) => return Ok(MutationOutcome::new(appointment, sync)),
        };

        let result = self
            .call(
                "event cancel",
                self.client.cancel_event(&credentials, &event_id),
            )
            .await;
        Ok(self.mirror_result(appointment, "cancel", result))
    }

    fn mirror_result(
        &self,
        appointment: Appointment,
        operation: &'static str,
        result: ProviderResult<bool>,
    ) -> MutationOutcome {
        match result {
            Ok(true) => MutationOutcome::new(appointment, ExternalSync::Synced),
            Ok(false) => {
                warn!(
                    appointment_id = %appointment.id,
                    mode = %self.mode,
                    operation,
                    "remote calendar reported no change"
                );
                MutationOutcome::new(
                    appointment,
                    ExternalSync::Failed(format!("remote {} reported no change", operation)),
                )
            }
            Err(e) => self.mirror_failed(appointment, operation, e),
        }
    }

    fn mirror_failed(
        &self,
        appointment: Appointment,
        operation: &'static str,
        error: ProviderError,
    ) -> MutationOutcome {
        warn!(
            appointment_id = %appointment.id,
            mode = %self.mode,
            operation,
            error = %error,
            transient = error.is_transient(),
            "remote calendar mirror failed"
        );
        MutationOutcome::new(appointment, ExternalSync::Failed(error.to_string()))
    }
}

impl AvailabilityStrategy for ExternalStrategy {
    fn mode(&self) -> IntegrationMode {
        self.mode
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
        Box::pin(self.create(request))
    }

    fn update_appointment<'a>(
        &'a self,
        appointment_id: &'a str,
        provider_id: &'a str,
        update: &'a AppointmentUpdate,
    ) -> BoxFuture<'a, EngineResult<MutationOutcome>> {
        Box::pin(self.update(appointment_id, provider_id, update))
    }

    fn cancel_appointment<'a>(
        &'a self,
        appointment_id: &'a str,
        provider_id: &'a str,
    ) -> BoxFuture<'a, EngineResult<MutationOutcome>> {
        Box::pin(self.cancel(appointment_id, provider_id))
    }

    fn get_expert_availability<'a>(
        &'a self,
        provider_id: &'a str,
    ) -> BoxFuture<'a, EngineResult<Vec<WeeklyAvailabilityWindow>>> {
        Box::pin(self.manual.weekly_windows(provider_id))
    }
}
