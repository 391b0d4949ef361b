//! Calendly client.
//!
//! Calendly exposes busy time per user through `user_busy_times`, limited to
//! seven days per request, so longer ranges are queried in chunks. Booking
//! goes through the scheduling API (`POST /invitees`). There is no way to
//! move a scheduled event, so updates keep the trait's unsupported default.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use slotbook_core::{AppointmentRequest, BookedInterval, DateRange, IntegrationMode};

use crate::client::{BoxFuture, CalendarClient, busy_interval, range_bounds};
use crate::credentials::CalendarCredentials;
use crate::error::{ProviderError, ProviderResult};
use crate::http;

/// Base URL for the Calendly v2 API.
pub const CALENDLY_API_BASE: &str = "https://api.calendly.com";

/// Longest window, in days, `user_busy_times` accepts in one request.
const MAX_QUERY_DAYS: i64 = 7;

/// Calendly API client.
#[derive(Debug, Clone)]
pub struct CalendlyClient {
    http_client: reqwest::Client,
    api_base: String,
}

impl CalendlyClient {
    /// Creates a client with the given request timeout.
    pub fn new(timeout: Duration) -> ProviderResult<Self> {
        Ok(Self {
            http_client: http::build_client(timeout)?,
            api_base: CALENDLY_API_BASE.to_string(),
        })
    }

    /// Builder method to point the client at another API base URL.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    async fn busy_times(
        &self,
        credentials: &CalendarCredentials,
        range: DateRange,
    ) -> ProviderResult<Vec<BookedInterval>> {
        let user = credentials.require_user_uri()?;
        let (start, end) = range_bounds(range);
        let url = http::join(&self.api_base, "user_busy_times");

        let mut intervals = Vec::new();
        for (chunk_start, chunk_end) in query_chunks(start, end) {
            let request = self
                .http_client
                .get(&url)
                .bearer_auth(&credentials.access_token)
                .query(&[
                    ("user", user.to_string()),
                    ("start_time", format_instant(chunk_start)),
                    ("end_time", format_instant(chunk_end)),
                ]);
            let response: BusyTimesResponse = http::read_json(http::send(request).await?).await?;
            debug!(
                start = %chunk_start,
                busy = response.collection.len(),
                "fetched calendly busy times"
            );
            intervals.extend(response.into_busy());
        }
        Ok(intervals)
    }

    async fn book_invitee(
        &self,
        credentials: &CalendarCredentials,
        request: &AppointmentRequest,
    ) -> ProviderResult<Option<String>> {
        let event_type = credentials.require_event_type_uri()?;
        let body = InviteeRequest {
            event_type: event_type.to_string(),
            start_time: format_instant(request.scheduled_at.and_utc()),
            invitee: Invitee {
                name: request.client_name.clone(),
                email: request.client_email.clone(),
                timezone: "UTC",
            },
        };

        let http_request = self
            .http_client
            .post(http::join(&self.api_base, "invitees"))
            .bearer_auth(&credentials.access_token)
            .json(&body);
        let created: InviteeResponse = http::read_json(http::send(http_request).await?).await?;
        Ok(created.event_id())
    }

    async fn cancel(
        &self,
        credentials: &CalendarCredentials,
        event_id: &str,
    ) -> ProviderResult<bool> {
        let url = http::join(
            &self.api_base,
            &format!(
                "scheduled_events/{}/cancellation",
                urlencoding::encode(event_id)
            ),
        );
        let request = self
            .http_client
            .post(url)
            .bearer_auth(&credentials.access_token)
            .json(&CancellationRequest {
                reason: "Appointment cancelled",
            });
        let response = http::send(request).await?;

        if http::is_gone(response.status()) {
            debug!(event_id, "calendly event already gone");
            return Ok(true);
        }
        http::ensure_success(response).await?;
        Ok(true)
    }
}

impl CalendarClient for CalendlyClient {
    fn integration(&self) -> IntegrationMode {
        IntegrationMode::Calendly
    }

    fn check_credentials(&self, credentials: &CalendarCredentials) -> ProviderResult<()> {
        if !credentials.has_token() {
            return Err(ProviderError::authentication("stored access token is empty")
                .with_provider(self.name()));
        }
        validate_uris(credentials).map_err(|e| e.with_provider(self.name()))
    }

    fn fetch_busy_intervals<'a>(
        &'a self,
        credentials: &'a CalendarCredentials,
        range: DateRange,
    ) -> BoxFuture<'a, ProviderResult<Vec<BookedInterval>>> {
        Box::pin(async move {
            self.busy_times(credentials, range)
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
            self.book_invitee(credentials, request)
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
            self.cancel(credentials, event_id)
                .await
                .map_err(|e| e.with_provider(self.name()))
        })
    }
}

/// Fails early when the stored URIs are missing or malformed.
fn validate_uris(credentials: &CalendarCredentials) -> ProviderResult<()> {
    let user = credentials.require_user_uri()?;
    url::Url::parse(user)
        .map_err(|e| ProviderError::configuration(format!("invalid calendly user_uri: {}", e)))?;
    if let Some(event_type) = credentials.event_type_uri.as_deref() {
        url::Url::parse(event_type).map_err(|e| {
            ProviderError::configuration(format!("invalid calendly event_type_uri: {}", e))
        })?;
    }
    Ok(())
}

/// Splits `[start, end)` into consecutive windows no longer than seven days.
fn query_chunks(start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let mut chunks = Vec::new();
    let span = chrono::Duration::days(MAX_QUERY_DAYS);
    let mut cursor = start;
    while cursor < end {
        let next = cursor.checked_add_signed(span).map_or(end, |next| next.min(end));
        chunks.push((cursor, next));
        cursor = next;
    }
    chunks
}

fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Returns the last path segment of a Calendly resource URI.
fn uri_uuid(uri: &str) -> Option<&str> {
    uri.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty() && !segment.contains(':'))
}

#[derive(Debug, Deserialize)]
struct BusyTimesResponse {
    #[serde(default)]
    collection: Vec<BusyTime>,
}

impl BusyTimesResponse {
    fn into_busy(self) -> impl Iterator<Item = BookedInterval> {
        self.collection
            .into_iter()
            .filter_map(|busy| busy_interval(busy.start_time, busy.end_time))
    }
}

#[derive(Debug, Deserialize)]
struct BusyTime {
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct InviteeRequest {
    event_type: String,
    start_time: String,
    invitee: Invitee,
}

#[derive(Debug, Serialize)]
struct Invitee {
    name: String,
    email: String,
    timezone: &'static str,
}

#[derive(Debug, Deserialize)]
struct InviteeResponse {
    resource: InviteeResource,
}

#[derive(Debug, Deserialize)]
struct InviteeResource {
    #[serde(default)]
    event: Option<String>,
}

impl InviteeResponse {
    /// The scheduled event's UUID, used later for cancellation.
    fn event_id(&self) -> Option<String> {
        self.resource
            .event
            .as_deref()
            .and_then(uri_uuid)
            .map(str::to_string)
    }
}

#[derive(Debug, Serialize)]
struct CancellationRequest {
    reason: &'static str,
}
