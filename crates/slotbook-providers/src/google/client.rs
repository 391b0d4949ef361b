//! Google Calendar API client.
//!
//! Busy time comes from the `freeBusy` endpoint; appointment mirroring uses
//! the `events` collection of the configured calendar (`primary` by default).

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use slotbook_core::{
    Appointment, AppointmentRequest, AppointmentUpdate, BookedInterval, DateRange,
    IntegrationMode, time::DATETIME_FORMAT,
};

use crate::client::{
    BoxFuture, CalendarClient, busy_interval, event_description, event_title, range_bounds,
};
use crate::credentials::CalendarCredentials;
use crate::error::{ProviderError, ProviderResult};
use crate::http;

/// Base URL for Google Calendar API v3.
pub const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Calendar used when the credentials do not name one.
const PRIMARY_CALENDAR: &str = "primary";

/// Google Calendar API client.
#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    api_base: String,
}

impl GoogleCalendarClient {
    /// Creates a client with the given request timeout.
    pub fn new(timeout: Duration) -> ProviderResult<Self> {
        Ok(Self {
            http_client: http::build_client(timeout)?,
            api_base: CALENDAR_API_BASE.to_string(),
        })
    }

    /// Builder method to point the client at another API base URL.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn events_url(&self, calendar_id: &str) -> String {
        http::join(
            &self.api_base,
            &format!("calendars/{}/events", urlencoding::encode(calendar_id)),
        )
    }

    fn event_url(&self, calendar_id: &str, event_id: &str) -> String {
        format!(
            "{}/{}",
            self.events_url(calendar_id),
            urlencoding::encode(event_id)
        )
    }

    async fn query_free_busy(
        &self,
        credentials: &CalendarCredentials,
        range: DateRange,
    ) -> ProviderResult<Vec<BookedInterval>> {
        let calendar_id = credentials.calendar_or(PRIMARY_CALENDAR);
        let (time_min, time_max) = range_bounds(range);
        let body = FreeBusyRequest {
            time_min,
            time_max,
            items: vec![FreeBusyItem {
                id: calendar_id.to_string(),
            }],
        };

        let request = self
            .http_client
            .post(http::join(&self.api_base, "freeBusy"))
            .bearer_auth(&credentials.access_token)
            .json(&body);
        let response: FreeBusyResponse = http::read_json(http::send(request).await?).await?;

        let intervals = response.into_busy(calendar_id)?;
        debug!(
            calendar = calendar_id,
            busy = intervals.len(),
            "fetched google busy intervals"
        );
        Ok(intervals)
    }

    async fn insert_event(
        &self,
        credentials: &CalendarCredentials,
        request: &AppointmentRequest,
    ) -> ProviderResult<Option<String>> {
        let calendar_id = credentials.calendar_or(PRIMARY_CALENDAR);
        let interval = request.interval();
        let body = EventBody {
            summary: Some(event_title(request)),
            description: Some(event_description(
                &request.client_email,
                request.notes.as_deref(),
            )),
            start: Some(EventDateTime::utc(interval.start)),
            end: Some(EventDateTime::utc(interval.end)),
            attendees: Some(vec![Attendee {
                email: request.client_email.clone(),
                display_name: Some(request.client_name.clone()),
            }]),
        };

        let http_request = self
            .http_client
            .post(self.events_url(calendar_id))
            .bearer_auth(&credentials.access_token)
            .json(&body);
        let created: CreatedEvent = http::read_json(http::send(http_request).await?).await?;

        if created.id.is_none() {
            warn!(calendar = calendar_id, "google created an event without an id");
        }
        Ok(created.id)
    }

    async fn patch_event(
        &self,
        credentials: &CalendarCredentials,
        event_id: &str,
        update: &AppointmentUpdate,
        appointment: &Appointment,
    ) -> ProviderResult<bool> {
        let calendar_id = credentials.calendar_or(PRIMARY_CALENDAR);
        let body = EventBody::patch(update, appointment);

        let request = self
            .http_client
            .patch(self.event_url(calendar_id, event_id))
            .bearer_auth(&credentials.access_token)
            .json(&body);
        http::ensure_success(http::send(request).await?).await?;
        Ok(true)
    }

    async fn delete_event(
        &self,
        credentials: &CalendarCredentials,
        event_id: &str,
    ) -> ProviderResult<bool> {
        let calendar_id = credentials.calendar_or(PRIMARY_CALENDAR);
        let request = self
            .http_client
            .delete(self.event_url(calendar_id, event_id))
            .bearer_auth(&credentials.access_token);
        let response = http::send(request).await?;

        if http::is_gone(response.status()) {
            debug!(event_id, "google event already deleted");
            return Ok(true);
        }
        http::ensure_success(response).await?;
        Ok(true)
    }
}

impl CalendarClient for GoogleCalendarClient {
    fn integration(&self) -> IntegrationMode {
        IntegrationMode::GoogleCalendar
    }

    fn fetch_busy_intervals<'a>(
        &'a self,
        credentials: &'a CalendarCredentials,
        range: DateRange,
    ) -> BoxFuture<'a, ProviderResult<Vec<BookedInterval>>> {
        Box::pin(async move {
            self.query_free_busy(credentials, range)
                .await
                .map_err(|e| e.with_provider(self.name()))
        })
    }

    fn create_event<'a>(
        &'a self,
        credentials: &'a CalendarCredentials,
        request: &'a AppointmentRequest,
    ) -> BoxFuture<'a, ProviderResult<Option<String>>> {
        Box::pin(async move {
            self.insert_event(credentials, request)
                .await
                .map_err(|e| e.with_provider(self.name()))
        })
    }

    fn update_event<'a>(
        &'a self,
        credentials: &'a CalendarCredentials,
        event_id: &'a str,
        update: &'a AppointmentUpdate,
        appointment: &'a Appointment,
    ) -> BoxFuture<'a, ProviderResult<bool>> {
        Box::pin(async move {
            self.patch_event(credentials, event_id, update, appointment)
                .await
                .map_err(|e| e.with_provider(self.name()))
        })
    }

    fn cancel_event<'a>(
        &'a self,
        credentials: &'a CalendarCredentials,
        event_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<bool>> {
        Box::pin(async move {
            self.delete_event(credentials, event_id)
                .await
                .map_err(|e| e.with_provider(self.name()))
        })
    }
}

/// Request body for `freeBusy`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FreeBusyRequest {
    time_min: DateTime<Utc>,
    time_max: DateTime<Utc>,
    items: Vec<FreeBusyItem>,
}

#[derive(Debug, Serialize)]
struct FreeBusyItem {
    id: String,
}

/// Response from `freeBusy`.
#[derive(Debug, Deserialize)]
struct FreeBusyResponse {
    #[serde(default)]
    calendars: std::collections::HashMap<String, FreeBusyCalendar>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyCalendar {
    #[serde(default)]
    busy: Vec<BusyPeriod>,
    #[serde(default)]
    errors: Vec<FreeBusyError>,
}

#[derive(Debug, Deserialize)]
struct BusyPeriod {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyError {
    #[serde(default)]
    domain: String,
    #[serde(default)]
    reason: String,
}

impl FreeBusyResponse {
    /// Extracts the busy intervals reported for `calendar_id`.
    ///
    /// Google reports per-calendar failures (e.g. `notFound`) inside a
    /// successful response, so those are turned into errors here.
    fn into_busy(mut self, calendar_id: &str) -> ProviderResult<Vec<BookedInterval>> {
        let calendar = self.calendars.remove(calendar_id).ok_or_else(|| {
            ProviderError::invalid_response(format!(
                "freeBusy response has no entry for calendar {}",
                calendar_id
            ))
        })?;

        if let Some(error) = calendar.errors.first() {
            return Err(ProviderError::invalid_response(format!(
                "freeBusy failed for calendar {}: {}/{}",
                calendar_id, error.domain, error.reason
            )));
        }

        Ok(calendar
            .busy
            .into_iter()
            .filter_map(|period| busy_interval(period.start, period.end))
            .collect())
    }
}

/// Event resource used for inserts and patches.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start: Option<EventDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end: Option<EventDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attendees: Option<Vec<Attendee>>,
}

impl EventBody {
    /// Builds a patch containing only the fields touched by `update`.
    fn patch(update: &AppointmentUpdate, appointment: &Appointment) -> Self {
        let mut body = Self::default();
        if update.scheduled_at.is_some() || update.duration_minutes.is_some() {
            let interval = appointment.interval();
            body.start = Some(EventDateTime::utc(interval.start));
            body.end = Some(EventDateTime::utc(interval.end));
        }
        if update.notes.is_some() {
            body.description = Some(event_description(
                &appointment.client_email,
                appointment.notes.as_deref(),
            ));
        }
        body
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventDateTime {
    date_time: String,
    time_zone: &'static str,
}

impl EventDateTime {
    /// Wall-clock times are sent as UTC; no timezone conversion is done.
    fn utc(dt: NaiveDateTime) -> Self {
        Self {
            date_time: dt.format(DATETIME_FORMAT).to_string(),
            time_zone: "UTC",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Attendee {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedEvent {
    id: Option<String>,
}
