//! CalendarClient trait definition.
//!
//! A [`CalendarClient`] is the boundary to one external calendar API. It can
//! report busy time for a date range and create, update or cancel the remote
//! event mirroring an internal appointment. Clients are stateless: every call
//! receives the provider's stored [`CalendarCredentials`].

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, NaiveDateTime, Utc};

use slotbook_core::{
    Appointment, AppointmentRequest, AppointmentUpdate, BookedInterval, DateRange,
    IntegrationMode, TimeInterval,
};

use crate::credentials::CalendarCredentials;
use crate::error::{ProviderError, ProviderErrorCode, ProviderResult};

/// A boxed future for object-safe async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Remote calendar API used by an external availability strategy.
///
/// Busy intervals are returned as half-open wall-clock intervals; remote
/// UTC timestamps are converted with [`busy_interval`].
pub trait CalendarClient: Send + Sync {
    /// The integration this client talks to.
    fn integration(&self) -> IntegrationMode;

    /// Returns the name used in logs and errors.
    fn name(&self) -> &str {
        self.integration().as_str()
    }

    /// Rejects credentials this client cannot work with before any request
    /// is made. The default accepts anything carrying a token.
    fn check_credentials(&self, credentials: &CalendarCredentials) -> ProviderResult<()> {
        if credentials.has_token() {
            Ok(())
        } else {
            Err(ProviderError::authentication("stored access token is empty")
                .with_provider(self.name()))
        }
    }

    /// Reports the busy intervals between the first and last date of `range`.
    fn fetch_busy_intervals<'a>(
        &'a self,
        credentials: &'a CalendarCredentials,
        range: DateRange,
    ) -> BoxFuture<'a, ProviderResult<Vec<BookedInterval>>>;

    /// Creates the remote event for a new appointment.
    ///
    /// Returns the remote event identifier when the API reports one.
    fn create_event<'a>(
        &'a self,
        credentials: &'a CalendarCredentials,
        request: &'a AppointmentRequest,
    ) -> BoxFuture<'a, ProviderResult<Option<String>>>;

    /// Applies `update` to the remote event `event_id`.
    ///
    /// `appointment` is the internal record after the update was applied, so
    /// implementations can derive the full new time span. The default
    /// implementation reports an unsupported operation.
    fn update_event<'a>(
        &'a self,
        _credentials: &'a CalendarCredentials,
        _event_id: &'a str,
        _update: &'a AppointmentUpdate,
        _appointment: &'a Appointment,
    ) -> BoxFuture<'a, ProviderResult<bool>> {
        let error = ProviderError::unsupported("event updates are not supported by this provider")
            .with_provider(self.name());
        Box::pin(async move { Err(error) })
    }

    /// Cancels the remote event `event_id`.
    fn cancel_event<'a>(
        &'a self,
        credentials: &'a CalendarCredentials,
        event_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<bool>>;
}

/// Converts a remote UTC busy period into a wall-clock interval.
///
/// Returns `None` for empty or reversed periods.
pub fn busy_interval(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<BookedInterval> {
    naive_busy_interval(start.naive_utc(), end.naive_utc())
}

/// Same as [`busy_interval`], for APIs that already report wall-clock times.
pub fn naive_busy_interval(start: NaiveDateTime, end: NaiveDateTime) -> Option<BookedInterval> {
    TimeInterval::try_new(start, end).filter(|interval| !interval.is_empty())
}

/// The UTC instants bounding `range` (`[first 00:00, last+1 00:00)`).
pub fn range_bounds(range: DateRange) -> (DateTime<Utc>, DateTime<Utc>) {
    let interval = range.to_interval();
    (interval.start.and_utc(), interval.end.and_utc())
}

/// Title used for remote events mirroring an appointment.
pub fn event_title(request: &AppointmentRequest) -> String {
    format!("Appointment with {}", request.client_name)
}

/// Description used for remote events mirroring an appointment.
pub fn event_description(client_email: &str, notes: Option<&str>) -> String {
    match notes.map(str::trim).filter(|n| !n.is_empty()) {
        Some(notes) => format!("Client: {}\n\n{}", client_email, notes),
        None => format!("Client: {}", client_email),
    }
}

/// A client that always fails.
///
/// Useful in tests and as a placeholder when a real client cannot be built.
#[derive(Debug)]
pub struct ErrorClient {
    integration: IntegrationMode,
    code: ProviderErrorCode,
    message: String,
}

impl ErrorClient {
    /// Creates a client that fails every call with `code` and `message`.
    pub fn new(
        integration: IntegrationMode,
        code: ProviderErrorCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            integration,
            code,
            message: message.into(),
        }
    }

    fn error(&self) -> ProviderError {
        ProviderError::new(self.code, self.message.clone()).with_provider(self.name())
    }
}

impl CalendarClient for ErrorClient {
    fn integration(&self) -> IntegrationMode {
        self.integration
    }

    fn fetch_busy_intervals<'a>(
        &'a self,
        _credentials: &'a CalendarCredentials,
        _range: DateRange,
    ) -> BoxFuture<'a, ProviderResult<Vec<BookedInterval>>> {
        let error = self.error();
        Box::pin(async move { Err(error) })
    }

    fn create_event<'a>(
        &'a self,
        _credentials: &'a CalendarCredentials,
        _request: &'a AppointmentRequest,
    ) -> BoxFuture<'a, ProviderResult<Option<String>>> {
        let error = self.error();
        Box::pin(async move { Err(error) })
    }

    fn update_event<'a>(
        &'a self,
        _credentials: &'a CalendarCredentials,
        _event_id: &'a str,
        _update: &'a AppointmentUpdate,
        _appointment: &'a Appointment,
    ) -> BoxFuture<'a, ProviderResult<bool>> {
        let error = self.error();
        Box::pin(async move { Err(error) })
    }

    fn cancel_event<'a>(
        &'a self,
        _credentials: &'a CalendarCredentials,
        _event_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<bool>> {
        let error = self.error();
        Box::pin(async move { Err(error) })
    }
}
