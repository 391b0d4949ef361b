//! Typed access to the engine's collections.
//!
//! Rows are stored with the serde shapes of the core model types, so
//! datetimes are `YYYY-MM-DDTHH:MM:SS` strings and times are `HH:MM`.

use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use slotbook_core::{
    Appointment, AppointmentRequest, AppointmentStatus, AppointmentUpdate, DateRange,
    IntegrationMode, UnknownIntegrationMode, WeeklyAvailabilityWindow, WindowInput,
    time::DATETIME_FORMAT,
};
use slotbook_providers::CalendarCredentials;

use crate::error::{EngineResult, StoreError};
use crate::store::{Filter, Query, RecordStore, Row};

/// Collection names.
pub mod collections {
    pub const AVAILABILITY: &str = "availability_settings";
    pub const BOOKINGS: &str = "bookings";
    pub const PROFILES: &str = "provider_profiles";
    pub const CREDENTIALS: &str = "calendar_credentials";
}

/// The part of a provider's profile the engine reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub id: String,
    #[serde(default)]
    pub calendar_integration: Option<String>,
}

impl ProviderProfile {
    /// Parses the configured integration.
    ///
    /// `Ok(None)` means no integration is configured.
    pub fn integration_mode(&self) -> Result<Option<IntegrationMode>, UnknownIntegrationMode> {
        match self.calendar_integration.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => value.parse().map(Some),
        }
    }
}

/// Typed wrapper around a [`RecordStore`].
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn RecordStore>,
}

impl Repository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// All weekly windows of a provider, ordered by day then start time.
    pub async fn weekly_windows(
        &self,
        provider_id: &str,
    ) -> EngineResult<Vec<WeeklyAvailabilityWindow>> {
        let query = Query::new(collections::AVAILABILITY)
            .eq("provider_id", provider_id)
            .order_by("day_of_week")
            .order_by("start_time");
        from_rows(self.store.select(&query).await?)
    }

    pub async fn insert_window(
        &self,
        provider_id: &str,
        input: &WindowInput,
    ) -> EngineResult<WeeklyAvailabilityWindow> {
        let mut row = to_row(input)?;
        row.insert("provider_id".to_string(), provider_id.into());
        let inserted = self
            .store
            .insert(collections::AVAILABILITY, vec![row])
            .await?;
        first_row(collections::AVAILABILITY, inserted)
    }

    /// Deletes one window; returns false if it did not exist.
    pub async fn delete_window(&self, provider_id: &str, window_id: &str) -> EngineResult<bool> {
        let filters = [
            Filter::eq("id", window_id),
            Filter::eq("provider_id", provider_id),
        ];
        let removed = self
            .store
            .delete(collections::AVAILABILITY, &filters)
            .await?;
        Ok(removed > 0)
    }

    /// Scheduled appointments starting between the first day's midnight and
    /// the last day's 23:59:59, inclusive.
    pub async fn scheduled_appointments(
        &self,
        provider_id: &str,
        range: DateRange,
    ) -> EngineResult<Vec<Appointment>> {
        let (Some(start), Some(end)) = (
            range.start.and_hms_opt(0, 0, 0),
            range.end.and_hms_opt(23, 59, 59),
        ) else {
            return Ok(Vec::new());
        };
        let query = Query::new(collections::BOOKINGS)
            .eq("provider_id", provider_id)
            .eq("status", AppointmentStatus::Scheduled.as_str())
            .gte("scheduled_at", stored_datetime(start))
            .lte("scheduled_at", stored_datetime(end))
            .order_by("scheduled_at");
        from_rows(self.store.select(&query).await?)
    }

    /// One appointment, scoped to its provider.
    pub async fn appointment(
        &self,
        appointment_id: &str,
        provider_id: &str,
    ) -> EngineResult<Option<Appointment>> {
        let query = Query::new(collections::BOOKINGS)
            .eq("id", appointment_id)
            .eq("provider_id", provider_id);
        self.store
            .select_single(&query)
            .await?
            .map(from_row)
            .transpose()
    }

    /// Inserts a new appointment with status `scheduled`.
    pub async fn insert_appointment(
        &self,
        request: &AppointmentRequest,
    ) -> EngineResult<Appointment> {
        let mut row = to_row(request)?;
        row.insert(
            "status".to_string(),
            AppointmentStatus::Scheduled.as_str().into(),
        );
        let inserted = self.store.insert(collections::BOOKINGS, vec![row]).await?;
        first_row(collections::BOOKINGS, inserted)
    }

    /// Applies `update` to the appointment; `None` if no row matched.
    pub async fn update_appointment(
        &self,
        appointment_id: &str,
        provider_id: &str,
        update: &AppointmentUpdate,
    ) -> EngineResult<Option<Appointment>> {
        self.patch_appointment(appointment_id, provider_id, to_row(update)?)
            .await
    }

    /// Sets the status to `cancelled`; `None` if no row matched.
    pub async fn cancel_appointment(
        &self,
        appointment_id: &str,
        provider_id: &str,
    ) -> EngineResult<Option<Appointment>> {
        let mut patch = Row::new();
        patch.insert(
            "status".to_string(),
            AppointmentStatus::Cancelled.as_str().into(),
        );
        self.patch_appointment(appointment_id, provider_id, patch)
            .await
    }

    /// Records the remote event mirroring an appointment.
    pub async fn set_external_event_id(
        &self,
        appointment_id: &str,
        provider_id: &str,
        event_id: &str,
    ) -> EngineResult<Option<Appointment>> {
        let mut patch = Row::new();
        patch.insert("external_event_id".to_string(), event_id.into());
        self.patch_appointment(appointment_id, provider_id, patch)
            .await
    }

    async fn patch_appointment(
        &self,
        appointment_id: &str,
        provider_id: &str,
        patch: Row,
    ) -> EngineResult<Option<Appointment>> {
        let filters = [
            Filter::eq("id", appointment_id),
            Filter::eq("provider_id", provider_id),
        ];
        let updated = self
            .store
            .update(collections::BOOKINGS, &filters, patch)
            .await?;
        updated.into_iter().next().map(from_row).transpose()
    }

    pub async fn provider_profile(
        &self,
        provider_id: &str,
    ) -> EngineResult<Option<ProviderProfile>> {
        let query = Query::new(collections::PROFILES).eq("id", provider_id);
        self.store
            .select_single(&query)
            .await?
            .map(from_row)
            .transpose()
    }

    /// Creates or replaces the provider's configured integration.
    pub async fn set_integration_mode(
        &self,
        provider_id: &str,
        mode: IntegrationMode,
    ) -> EngineResult<ProviderProfile> {
        let mut patch = Row::new();
        patch.insert("calendar_integration".to_string(), mode.as_str().into());

        let updated = self
            .store
            .update(collections::PROFILES, &[Filter::eq("id", provider_id)], patch)
            .await?;
        if let Some(row) = updated.into_iter().next() {
            return from_row(row);
        }

        let profile = ProviderProfile {
            id: provider_id.to_string(),
            calendar_integration: Some(mode.as_str().to_string()),
        };
        let inserted = self
            .store
            .insert(collections::PROFILES, vec![to_row(&profile)?])
            .await?;
        first_row(collections::PROFILES, inserted)
    }

    /// Usable credentials for `(provider_id, integration)`.
    ///
    /// Expired credentials are treated as absent.
    pub async fn credentials(
        &self,
        provider_id: &str,
        integration: IntegrationMode,
    ) -> EngineResult<Option<CalendarCredentials>> {
        let query = Query::new(collections::CREDENTIALS)
            .eq("provider_id", provider_id)
            .eq("integration", integration.as_str());
        let Some(row) = self.store.select_single(&query).await? else {
            return Ok(None);
        };
        let credentials: CalendarCredentials = from_row(row)?;
        if credentials.is_expired_at(Utc::now()) {
            warn!(provider_id, mode = %integration, "stored calendar credentials expired");
            return Ok(None);
        }
        debug!(provider_id, mode = %integration, "loaded calendar credentials");
        Ok(Some(credentials))
    }

    /// Stores credentials, replacing any previous ones for the same
    /// provider and integration.
    pub async fn save_credentials(&self, credentials: &CalendarCredentials) -> EngineResult<()> {
        let filters = [
            Filter::eq("provider_id", credentials.provider_id.as_str()),
            Filter::eq("integration", credentials.integration.as_str()),
        ];
        self.store
            .delete(collections::CREDENTIALS, &filters)
            .await?;
        self.store
            .insert(collections::CREDENTIALS, vec![to_row(credentials)?])
            .await?;
        Ok(())
    }
}

fn stored_datetime(dt: NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

fn to_row<T: Serialize>(value: &T) -> EngineResult<Row> {
    match serde_json::to_value(value)? {
        Value::Object(row) => Ok(row),
        other => Err(StoreError::backend(format!("expected an object row, got {}", other)).into()),
    }
}

fn from_row<T: DeserializeOwned>(row: Row) -> EngineResult<T> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

fn from_rows<T: DeserializeOwned>(rows: Vec<Row>) -> EngineResult<Vec<T>> {
    rows.into_iter().map(from_row).collect()
}

fn first_row<T: DeserializeOwned>(collection: &str, rows: Vec<Row>) -> EngineResult<T> {
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| StoreError::backend(format!("insert into {} returned no row", collection)))?;
    from_row(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{Duration, NaiveDate, NaiveTime};

    fn repo() -> Repository {
        Repository::new(Arc::new(MemoryStore::new()))
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn request(day: u32, h: u32) -> AppointmentRequest {
        AppointmentRequest::new(
            "p1",
            "c1",
            "Ada",
            "ada@example.com",
            date(day).and_time(hm(h, 0)),
            30,
        )
    }

    #[tokio::test]
    async fn windows_come_back_ordered() {
        let repo = repo();
        repo.insert_window("p1", &WindowInput::new(3, hm(9, 0), hm(12, 0)))
            .await
            .unwrap();
        repo.insert_window("p1", &WindowInput::new(1, hm(14, 0), hm(17, 0)))
            .await
            .unwrap();
        repo.insert_window("p1", &WindowInput::new(1, hm(9, 0), hm(12, 0)))
            .await
            .unwrap();
        repo.insert_window("p2", &WindowInput::new(0, hm(9, 0), hm(12, 0)))
            .await
            .unwrap();

        let windows = repo.weekly_windows("p1").await.unwrap();
        let keys: Vec<_> = windows
            .iter()
            .map(|w| (w.day_of_week, w.start_time))
            .collect();
        assert_eq!(keys, vec![(1, hm(9, 0)), (1, hm(14, 0)), (3, hm(9, 0))]);
        assert!(windows.iter().all(|w| w.provider_id == "p1"));
    }

    #[tokio::test]
    async fn delete_window_is_scoped_to_provider() {
        let repo = repo();
        let window = repo
            .insert_window("p1", &WindowInput::new(1, hm(9, 0), hm(12, 0)))
            .await
            .unwrap();

        assert!(!repo.delete_window("p2", &window.id).await.unwrap());
        assert!(repo.delete_window("p1", &window.id).await.unwrap());
        assert!(repo.weekly_windows("p1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn scheduled_appointments_cover_whole_last_day() {
        let repo = repo();
        repo.insert_appointment(&request(3, 0)).await.unwrap();
        repo.insert_appointment(&request(4, 23)).await.unwrap();
        let outside = repo.insert_appointment(&request(5, 0)).await.unwrap();
        let cancelled = repo.insert_appointment(&request(4, 12)).await.unwrap();
        repo.cancel_appointment(&cancelled.id, "p1").await.unwrap();

        let found = repo
            .scheduled_appointments("p1", DateRange::new(date(3), date(4)))
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|a| a.id != outside.id && a.id != cancelled.id));
        assert!(found[0].scheduled_at < found[1].scheduled_at);
    }

    #[tokio::test]
    async fn appointment_lifecycle() {
        let repo = repo();
        let created = repo.insert_appointment(&request(3, 10)).await.unwrap();
        assert_eq!(created.status, AppointmentStatus::Scheduled);
        assert!(created.external_event_id.is_none());

        let update = AppointmentUpdate::new().with_duration_minutes(45);
        let updated = repo
            .update_appointment(&created.id, "p1", &update)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.duration_minutes, 45);
        assert_eq!(updated.scheduled_at, created.scheduled_at);

        let linked = repo
            .set_external_event_id(&created.id, "p1", "evt-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(linked.external_event_id.as_deref(), Some("evt-1"));

        assert!(
            repo.update_appointment(&created.id, "other", &update)
                .await
                .unwrap()
                .is_none()
        );
        assert!(repo.appointment(&created.id, "other").await.unwrap().is_none());
        assert!(repo.appointment(&created.id, "p1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn profile_modes() {
        let repo = repo();
        assert!(repo.provider_profile("p1").await.unwrap().is_none());

        let profile = repo
            .set_integration_mode("p1", IntegrationMode::Calendly)
            .await
            .unwrap();
        assert_eq!(profile.integration_mode(), Ok(Some(IntegrationMode::Calendly)));

        repo.set_integration_mode("p1", IntegrationMode::GoogleCalendar)
            .await
            .unwrap();
        let profile = repo.provider_profile("p1").await.unwrap().unwrap();
        assert_eq!(
            profile.integration_mode(),
            Ok(Some(IntegrationMode::GoogleCalendar))
        );

        let blank = ProviderProfile {
            id: "p2".to_string(),
            calendar_integration: Some("  ".to_string()),
        };
        assert_eq!(blank.integration_mode(), Ok(None));

        let unknown = ProviderProfile {
            id: "p3".to_string(),
            calendar_integration: Some("outlook".to_string()),
        };
        assert!(unknown.integration_mode().is_err());
    }

    #[tokio::test]
    async fn expired_credentials_are_absent() {
        let repo = repo();
        let creds = CalendarCredentials::new("p1", IntegrationMode::GoogleCalendar, "tok")
            .with_expires_at(Utc::now() - Duration::minutes(5));
        repo.save_credentials(&creds).await.unwrap();
        assert!(
            repo.credentials("p1", IntegrationMode::GoogleCalendar)
                .await
                .unwrap()
                .is_none()
        );

        let fresh = creds.with_expires_at(Utc::now() + Duration::hours(1));
        repo.save_credentials(&fresh).await.unwrap();
        let loaded = repo
            .credentials("p1", IntegrationMode::GoogleCalendar)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.access_token, "tok");

        assert!(
            repo.credentials("p1", IntegrationMode::Calendly)
                .await
                .unwrap()
                .is_none()
        );
    }
}
