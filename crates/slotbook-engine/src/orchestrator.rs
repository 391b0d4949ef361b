//! Per-provider strategy selection.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};

use slotbook_core::{
    AppointmentRequest, AppointmentUpdate, AvailabilitySlot, DateRange, IntegrationMode,
    WeeklyAvailabilityWindow,
};
use slotbook_providers::{
    CalendarClient, CalendlyClient, GoogleCalendarClient, Office365CalendarClient,
};

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::repository::Repository;
use crate::store::RecordStore;
use crate::strategy::{AvailabilityStrategy, ExternalStrategy, ManualStrategy, MutationOutcome};

/// One calendar client per external integration.
#[derive(Clone)]
pub struct CalendarClients {
    pub google: Arc<dyn CalendarClient>,
    pub office365: Arc<dyn CalendarClient>,
    pub calendly: Arc<dyn CalendarClient>,
}

impl CalendarClients {
    /// HTTP clients pointed at the API bases in `config`.
    pub fn from_config(config: &EngineConfig) -> EngineResult<Self> {
        let timeout = config.external_timeout();
        Ok(Self {
            google: Arc::new(
                GoogleCalendarClient::new(timeout)?.with_api_base(&config.google_api_base),
            ),
            office365: Arc::new(
                Office365CalendarClient::new(timeout)?.with_api_base(&config.graph_api_base),
            ),
            calendly: Arc::new(
                CalendlyClient::new(timeout)?.with_api_base(&config.calendly_api_base),
            ),
        })
    }
}

/// Entry point for availability queries and booking mutations.
///
/// Every call looks up the provider's integration mode and delegates to the
/// matching strategy. Anything that prevents a mode from being resolved
/// selects the manual strategy.
pub struct Orchestrator {
    manual: ManualStrategy,
    google: ExternalStrategy,
    office365: ExternalStrategy,
    calendly: ExternalStrategy,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn RecordStore>,
        clients: CalendarClients,
        config: &EngineConfig,
    ) -> Self {
        let manual = ManualStrategy::new(Repository::new(store));
        let timeout = config.external_timeout();
        let external = |mode, client| ExternalStrategy::new(mode, client, manual.clone(), timeout);

        Self {
            google: external(IntegrationMode::GoogleCalendar, clients.google),
            office365: external(IntegrationMode::Office365Calendar, clients.office365),
            calendly: external(IntegrationMode::Calendly, clients.calendly),
            manual,
        }
    }

    /// Builds the orchestrator with real HTTP calendar clients.
    pub fn from_config(store: Arc<dyn RecordStore>, config: &EngineConfig) -> EngineResult<Self> {
        let clients = CalendarClients::from_config(config)?;
        Ok(Self::new(store, clients, config))
    }

    /// The manual strategy, which also owns weekly template management.
    pub fn manual(&self) -> &ManualStrategy {
        &self.manual
    }

    pub fn repository(&self) -> &Repository {
        self.manual.repository()
    }

    /// The integration mode governing `provider_id`, or `Manual` when it
    /// cannot be determined.
    pub async fn resolve_mode(&self, provider_id: &str) -> IntegrationMode {
        let profile = match self.repository().provider_profile(provider_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                warn!(provider_id, "no provider profile, using manual availability");
                return IntegrationMode::Manual;
            }
            Err(e) => {
                warn!(
                    provider_id,
                    error = %e,
                    "provider profile lookup failed, using manual availability"
                );
                return IntegrationMode::Manual;
            }
        };

        match profile.integration_mode() {
            Ok(Some(mode)) => {
                debug!(provider_id, mode = %mode, "resolved integration mode");
                mode
            }
            Ok(None) => {
                warn!(provider_id, "no calendar integration configured, using manual availability");
                IntegrationMode::Manual
            }
            Err(e) => {
                warn!(provider_id, error = %e, "using manual availability");
                IntegrationMode::Manual
            }
        }
    }

    pub fn strategy(&self, mode: IntegrationMode) -> &dyn AvailabilityStrategy {
        match mode {
            IntegrationMode::Manual => &self.manual,
            IntegrationMode::GoogleCalendar => &self.google,
            IntegrationMode::Office365Calendar => &self.office365,
            IntegrationMode::Calendly => &self.calendly,
        }
    }

    async fn strategy_for(&self, provider_id: &str) -> &dyn AvailabilityStrategy {
        let mode = self.resolve_mode(provider_id).await;
        self.strategy(mode)
    }

    /// Free whole windows from `start` to `end`, both inclusive.
    pub async fn get_available_slots(
        &self,
        provider_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> EngineResult<Vec<AvailabilitySlot>> {
        let range = DateRange::new(start, end);
        self.strategy_for(provider_id)
            .await
            .get_available_slots(provider_id, range)
            .await
    }

    /// Creates an appointment; true once the internal record exists.
    pub async fn create_appointment(&self, request: &AppointmentRequest) -> bool {
        succeeded("create", &request.provider_id, self.create_appointment_outcome(request).await)
    }

    pub async fn create_appointment_outcome(
        &self,
        request: &AppointmentRequest,
    ) -> EngineResult<MutationOutcome> {
        self.strategy_for(&request.provider_id)
            .await
            .create_appointment(request)
            .await
    }

    /// Updates an appointment; true once the internal record changed.
    pub async fn update_appointment(
        &self,
        appointment_id: &str,
        provider_id: &str,
        update: &AppointmentUpdate,
    ) -> bool {
        let outcome = self
            .update_appointment_outcome(appointment_id, provider_id, update)
            .await;
        succeeded("update", provider_id, outcome)
    }

    pub async fn update_appointment_outcome(
        &self,
        appointment_id: &str,
        provider_id: &str,
        update: &AppointmentUpdate,
    ) -> EngineResult<MutationOutcome> {
        self.strategy_for(provider_id)
            .await
            .update_appointment(appointment_id, provider_id, update)
            .await
    }

    /// Cancels an appointment; true once the internal record is cancelled.
    pub async fn cancel_appointment(&self, appointment_id: &str, provider_id: &str) -> bool {
        let outcome = self
            .cancel_appointment_outcome(appointment_id, provider_id)
            .await;
        succeeded("cancel", provider_id, outcome)
    }

    pub async fn cancel_appointment_outcome(
        &self,
        appointment_id: &str,
        provider_id: &str,
    ) -> EngineResult<MutationOutcome> {
        self.strategy_for(provider_id)
            .await
            .cancel_appointment(appointment_id, provider_id)
            .await
    }

    /// The provider's weekly template, regardless of integration mode.
    pub async fn get_expert_availability(
        &self,
        provider_id: &str,
    ) -> EngineResult<Vec<WeeklyAvailabilityWindow>> {
        self.manual.weekly_windows(provider_id).await
    }
}

fn succeeded(
    operation: &'static str,
    provider_id: &str,
    outcome: EngineResult<MutationOutcome>,
) -> bool {
    match outcome {
        Ok(outcome) => {
            debug!(
                provider_id,
                operation,
                appointment_id = %outcome.internal.id,
                external = %outcome.external,
                "appointment mutation committed"
            );
            true
        }
        Err(e) => {
            warn!(provider_id, operation, error = %e, "appointment mutation failed");
            false
        }
    }
}
