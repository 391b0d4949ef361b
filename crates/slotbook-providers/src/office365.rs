//! Microsoft 365 calendar client (Microsoft Graph).
//!
//! Busy time is read from `calendarView`, which expands recurring series on
//! the server. Pages are followed through `@odata.nextLink`.

use std::time::Duration;

use chrono::{NaiveDateTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use slotbook_core::{
    Appointment, AppointmentRequest, AppointmentUpdate, BookedInterval, DateRange,
    IntegrationMode, parse_wall_datetime, time::DATETIME_FORMAT,
};

use crate::client::{
    BoxFuture, CalendarClient, event_description, event_title, naive_busy_interval, range_bounds,
};
use crate::credentials::CalendarCredentials;
use crate::error::{ProviderError, ProviderResult};
use crate::http;

/// Base URL for Microsoft Graph v1.0.
pub const GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";

const UTC_PREFER_HEADER: &str = r#"outlook.timezone="UTC""#;
const PAGE_SIZE: u32 = 100;
const MAX_PAGES: usize = 50;

/// Microsoft Graph calendar client.
#[derive(Debug, Clone)]
pub struct Office365CalendarClient {
    http_client: reqwest::Client,
    api_base: String,
}

impl Office365CalendarClient {
    /// Creates a client with the given request timeout.
    pub fn new(timeout: Duration) -> ProviderResult<Self> {
        Ok(Self {
            http_client: http::build_client(timeout)?,
            api_base: GRAPH_API_BASE.to_string(),
        })
    }

    /// Builder method to point the client at another API base URL.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Path prefix of the calendar to use; `me` is the default calendar.
    fn calendar_path(credentials: &CalendarCredentials) -> String {
        match credentials.calendar_id.as_deref() {
            Some(id) if !id.eq_ignore_ascii_case("primary") => {
                format!("me/calendars/{}", urlencoding::encode(id))
            }
            _ => "me".to_string(),
        }
    }

    fn event_url(&self, event_id: &str) -> String {
        http::join(
            &self.api_base,
            &format!("me/events/{}", urlencoding::encode(event_id)),
        )
    }

    async fn calendar_view(
        &self,
        credentials: &CalendarCredentials,
        range: DateRange,
    ) -> ProviderResult<Vec<BookedInterval>> {
        let (start, end) = range_bounds(range);
        let first_url = http::join(
            &self.api_base,
            &format!("{}/calendarView", Self::calendar_path(credentials)),
        );
        let query = [
            ("startDateTime", start.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("endDateTime", end.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("$select", "start,end,showAs,isCancelled".to_string()),
            ("$top", PAGE_SIZE.to_string()),
        ];

        let mut intervals = Vec::new();
        let mut next_link: Option<String> = None;

        for page in 0..MAX_PAGES {
            let request = match next_link.take() {
                // nextLink already carries the query string.
                Some(url) => self.http_client.get(url),
                None => self.http_client.get(&first_url).query(&query),
            };
            let request = request
                .bearer_auth(&credentials.access_token)
                .header("Prefer", UTC_PREFER_HEADER);

            let response: CalendarViewPage = http::read_json(http::send(request).await?).await?;
            debug!(page, events = response.value.len(), "fetched graph calendarView page");

            intervals.extend(response.busy_intervals()?);

            match response.next_link {
                Some(link) => next_link = Some(link),
                None => return Ok(intervals),
            }
        }

        warn!(max_pages = MAX_PAGES, "graph calendarView pagination truncated");
        Err(ProviderError::invalid_response(format!(
            "calendarView still paging after {} pages",
            MAX_PAGES
        )))
    }

    async fn insert_event(
        &self,
        credentials: &CalendarCredentials,
        request: &AppointmentRequest,
    ) -> ProviderResult<Option<String>> {
        let interval = request.interval();
        let body = GraphEventBody {
            subject: Some(event_title(request)),
            body: Some(ItemBody::text(event_description(
                &request.client_email,
                request.notes.as_deref(),
            ))),
            start: Some(GraphDateTime::utc(interval.start)),
            end: Some(GraphDateTime::utc(interval.end)),
            attendees: Some(vec![GraphAttendee {
                email_address: EmailAddress {
                    address: request.client_email.clone(),
                    name: Some(request.client_name.clone()),
                },
                kind: "required",
            }]),
        };

        let url = http::join(
            &self.api_base,
            &format!("{}/events", Self::calendar_path(credentials)),
        );
        let http_request = self
            .http_client
            .post(url)
            .bearer_auth(&credentials.access_token)
            .json(&body);
        let created: CreatedEvent = http::read_json(http::send(http_request).await?).await?;
        Ok(created.id)
    }

    async fn patch_event(
        &self,
        credentials: &CalendarCredentials,
        event_id: &str,
        update: &AppointmentUpdate,
        appointment: &Appointment,
    ) -> ProviderResult<bool> {
        let body = GraphEventBody::patch(update, appointment);
        let request = self
            .http_client
            .patch(self.event_url(event_id))
            .bearer_auth(&credentials.access_token)
            .json(&body);
        http::ensure_success(http::send(request).await?).await?;
        Ok(true)
    }

    async fn cancel(
        &self,
        credentials: &CalendarCredentials,
        event_id: &str,
    ) -> ProviderResult<bool> {
        let url = format!("{}/cancel", self.event_url(event_id));
        let request = self
            .http_client
            .post(url)
            .bearer_auth(&credentials.access_token)
            .json(&CancelBody {
                comment: "Appointment cancelled",
            });
        let response = http::send(request).await?;

        if http::is_gone(response.status()) {
            debug!(event_id, "graph event already gone");
            return Ok(true);
        }
        http::ensure_success(response).await?;
        Ok(true)
    }
}

impl CalendarClient for Office365CalendarClient {
    fn integration(&self) -> IntegrationMode {
        IntegrationMode::Office365Calendar
    }

    fn fetch_busy_intervals<'a>(
        &'a self,
        credentials: &'a CalendarCredentials,
        range: DateRange,
    ) -> BoxFuture<'a, ProviderResult<Vec<BookedInterval>>> {
        Box::pin(async move {
            self.calendar_view(credentials, range)
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
            self.cancel(credentials, event_id)
                .await
                .map_err(|e| e.with_provider(self.name()))
        })
    }
}

#[derive(Debug, Deserialize)]
struct CalendarViewPage {
    #[serde(default)]
    value: Vec<GraphEvent>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

impl CalendarViewPage {
    fn busy_intervals(&self) -> ProviderResult<Vec<BookedInterval>> {
        let mut intervals = Vec::new();
        for event in self.value.iter().filter(|e| e.is_busy()) {
            let start = event.start.to_naive()?;
            let end = event.end.to_naive()?;
            intervals.extend(naive_busy_interval(start, end));
        }
        Ok(intervals)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphEvent {
    start: GraphDateTimeIn,
    end: GraphDateTimeIn,
    #[serde(default)]
    show_as: Option<String>,
    #[serde(default)]
    is_cancelled: bool,
}

impl GraphEvent {
    /// Cancelled events and events shown as free do not block time.
    fn is_busy(&self) -> bool {
        !self.is_cancelled
            && !self
                .show_as
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case("free"))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphDateTimeIn {
    date_time: String,
    #[serde(default)]
    time_zone: Option<String>,
}

impl GraphDateTimeIn {
    fn to_naive(&self) -> ProviderResult<NaiveDateTime> {
        if let Some(tz) = self.time_zone.as_deref().filter(|tz| !tz.eq_ignore_ascii_case("utc")) {
            warn!(time_zone = tz, "graph returned a non-UTC time; using it as-is");
        }
        parse_wall_datetime(&self.date_time).map_err(|e| {
            ProviderError::invalid_response(format!("bad graph dateTime: {}", e))
        })
    }
}

#[derive(Debug, Default, Serialize)]
struct GraphEventBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<ItemBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start: Option<GraphDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end: Option<GraphDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attendees: Option<Vec<GraphAttendee>>,
}

impl GraphEventBody {
    fn patch(update: &AppointmentUpdate, appointment: &Appointment) -> Self {
        let mut body = Self::default();
        if update.scheduled_at.is_some() || update.duration_minutes.is_some() {
            let interval = appointment.interval();
            body.start = Some(GraphDateTime::utc(interval.start));
            body.end = Some(GraphDateTime::utc(interval.end));
        }
        if update.notes.is_some() {
            body.body = Some(ItemBody::text(event_description(
                &appointment.client_email,
                appointment.notes.as_deref(),
            )));
        }
        body
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemBody {
    content_type: &'static str,
    content: String,
}

impl ItemBody {
    fn text(content: String) -> Self {
        Self {
            content_type: "text",
            content,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphDateTime {
    date_time: String,
    time_zone: &'static str,
}

impl GraphDateTime {
    fn utc(dt: NaiveDateTime) -> Self {
        Self {
            date_time: dt.format(DATETIME_FORMAT).to_string(),
            time_zone: "UTC",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphAttendee {
    email_address: EmailAddress,
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct EmailAddress {
    address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct CancelBody {
    comment: &'static str,
}

#[derive(Debug, Deserialize)]
struct CreatedEvent {
    id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn parse_calendar_view_page() {
        let json = r#"{
            "@odata.context": "https://graph.microsoft.com/v1.0/$metadata#users('me')/calendarView",
            "value": [
                {
                    "start": {"dateTime": "2025-03-03T09:00:00.0000000", "timeZone": "UTC"},
                    "end": {"dateTime": "2025-03-03T10:00:00.0000000", "timeZone": "UTC"},
                    "showAs": "busy",
                    "isCancelled": false
                },
                {
                    "start": {"dateTime": "2025-03-03T11:00:00.0000000", "timeZone": "UTC"},
                    "end": {"dateTime": "2025-03-03T12:00:00.0000000", "timeZone": "UTC"},
                    "showAs": "free",
                    "isCancelled": false
                },
                {
                    "start": {"dateTime": "2025-03-03T13:00:00.0000000", "timeZone": "UTC"},
                    "end": {"dateTime": "2025-03-03T14:00:00.0000000", "timeZone": "UTC"},
                    "showAs": "busy",
                    "isCancelled": true
                },
                {
                    "start": {"dateTime": "2025-03-03T23:30:00.0000000", "timeZone": "UTC"},
                    "end": {"dateTime": "2025-03-04T00:30:00.0000000", "timeZone": "UTC"},
                    "showAs": "tentative"
                }
            ],
            "@odata.nextLink": "https://graph.microsoft.com/v1.0/me/calendarView?$skiptoken=abc"
        }"#;

        let page: CalendarViewPage = serde_json::from_str(json).unwrap();
        assert!(page.next_link.is_some());

        let busy = page.busy_intervals().unwrap();
        assert_eq!(busy.len(), 2);
        assert_eq!(busy[0].start, at(3, 9, 0));
        assert_eq!(busy[0].end, at(3, 10, 0));
        assert_eq!(busy[1].end, at(4, 0, 30));
    }

    #[test]
    fn last_page_has_no_next_link() {
        let page: CalendarViewPage = serde_json::from_str(r#"{"value": []}"#).unwrap();
        assert!(page.next_link.is_none());
        assert!(page.busy_intervals().unwrap().is_empty());
    }

    #[test]
    fn bad_datetime_is_invalid_response() {
        let json = r#"{"value": [{
            "start": {"dateTime": "not a time", "timeZone": "UTC"},
            "end": {"dateTime": "2025-03-03T10:00:00", "timeZone": "UTC"}
        }]}"#;
        let page: CalendarViewPage = serde_json::from_str(json).unwrap();
        let err = page.busy_intervals().unwrap_err();
        assert_eq!(
            err.code(),
            crate::error::ProviderErrorCode::InvalidResponse
        );
    }

    #[test]
    fn calendar_path_uses_named_calendar() {
        let creds = CalendarCredentials::new("p1", IntegrationMode::Office365Calendar, "tok");
        assert_eq!(Office365CalendarClient::calendar_path(&creds), "me");

        let creds = creds.clone().with_calendar_id("AAMk=");
        assert_eq!(
            Office365CalendarClient::calendar_path(&creds),
            "me/calendars/AAMk%3D"
        );
    }

    #[test]
    fn event_body_shape() {
        let body = GraphEventBody {
            subject: Some("Appointment with Ada".to_string()),
            body: Some(ItemBody::text("Client: ada@example.com".to_string())),
            start: Some(GraphDateTime::utc(at(3, 10, 0))),
            end: Some(GraphDateTime::utc(at(3, 10, 30))),
            attendees: Some(vec![GraphAttendee {
                email_address: EmailAddress {
                    address: "ada@example.com".to_string(),
                    name: None,
                },
                kind: "required",
            }]),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["start"]["dateTime"], "2025-03-03T10:00:00");
        assert_eq!(json["start"]["timeZone"], "UTC");
        assert_eq!(json["body"]["contentType"], "text");
        assert_eq!(json["attendees"][0]["type"], "required");
        assert_eq!(json["attendees"][0]["emailAddress"]["address"], "ada@example.com");
    }

    mod paging {
        use super::*;
        use serde_json::json;
        use wiremock::matchers::{method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        use crate::error::ProviderErrorCode;

        fn busy_event(start: &str, end: &str) -> serde_json::Value {
            json!({
                "start": {"dateTime": start, "timeZone": "UTC"},
                "end": {"dateTime": end, "timeZone": "UTC"},
                "showAs": "busy"
            })
        }

        fn client(server: &MockServer) -> Office365CalendarClient {
            Office365CalendarClient::new(Duration::from_secs(5))
                .unwrap()
                .with_api_base(server.uri())
        }

        fn credentials() -> CalendarCredentials {
            CalendarCredentials::new("p1", IntegrationMode::Office365Calendar, "tok")
        }

        fn monday() -> DateRange {
            DateRange::single(NaiveDate::from_ymd_opt(2025, 3, 3).unwrap())
        }

        #[tokio::test]
        async fn follows_next_link_until_last_page() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/me/calendarView"))
                .and(query_param("$skiptoken", "2"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "value": [busy_event("2025-03-03T14:00:00", "2025-03-03T15:00:00")]
                })))
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/me/calendarView"))
                .and(query_param("$top", "100"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "value": [busy_event("2025-03-03T09:00:00", "2025-03-03T10:00:00")],
                    "@odata.nextLink": format!("{}/me/calendarView?$skiptoken=2", server.uri())
                })))
                .mount(&server)
                .await;

            let busy = client(&server)
                .fetch_busy_intervals(&credentials(), monday())
                .await
                .unwrap();
            assert_eq!(busy.len(), 2);
            assert_eq!(busy[0].start, at(3, 9, 0));
            assert_eq!(busy[1].start, at(3, 14, 0));
        }

        #[tokio::test]
        async fn endless_paging_is_an_error() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/me/calendarView"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "value": [busy_event("2025-03-03T09:00:00", "2025-03-03T10:00:00")],
                    "@odata.nextLink": format!("{}/me/calendarView?$skiptoken=again", server.uri())
                })))
                .expect(MAX_PAGES as u64)
                .mount(&server)
                .await;

            let err = client(&server)
                .fetch_busy_intervals(&credentials(), monday())
                .await
                .unwrap_err();
            assert_eq!(err.code(), ProviderErrorCode::InvalidResponse);
        }
    }
}
