//! Domain types for provider availability and bookings.
//!
//! - [`IntegrationMode`]: which calendar backend governs a provider
//! - [`WeeklyAvailabilityWindow`]: a recurring weekly template entry
//! - [`AvailabilitySlot`]: a concrete, dated, bookable window
//! - [`Appointment`]: the internal booking record (source of truth)
//! - [`AppointmentRequest`] / [`AppointmentUpdate`]: mutation payloads

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::time::{TimeInterval, day_of_week, wall_datetime, wall_time};

/// An occupied interval, from an internal booking or an external busy report.
///
/// Booked intervals are computed per query and never persisted.
pub type BookedInterval = TimeInterval;

/// The calendar backend a provider is configured with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationMode {
    /// Availability and bookings live only in the internal record store.
    #[default]
    Manual,
    /// Google Calendar.
    GoogleCalendar,
    /// Microsoft 365 / Outlook calendar.
    Office365Calendar,
    /// Calendly.
    Calendly,
}

impl IntegrationMode {
    /// All integration modes.
    pub const ALL: [IntegrationMode; 4] = [
        Self::Manual,
        Self::GoogleCalendar,
        Self::Office365Calendar,
        Self::Calendly,
    ];

    /// Returns the stored string form of this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::GoogleCalendar => "google_calendar",
            Self::Office365Calendar => "office365_calendar",
            Self::Calendly => "calendly",
        }
    }

    /// Returns true if the mode synchronizes with an external calendar.
    pub fn is_external(&self) -> bool {
        !matches!(self, Self::Manual)
    }
}

impl fmt::Display for IntegrationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognized integration mode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown integration mode '{0}'")]
pub struct UnknownIntegrationMode(pub String);

impl FromStr for IntegrationMode {
    type Err = UnknownIntegrationMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim();
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(normalized))
            .ok_or_else(|| UnknownIntegrationMode(s.to_string()))
    }
}

fn default_true() -> bool {
    true
}

/// A recurring weekly availability entry.
///
/// `day_of_week` is Sunday-first (0 = Sunday ... 6 = Saturday). Times are
/// wall-clock with minute precision. Overlapping windows on the same day are
/// not rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyAvailabilityWindow {
    /// Record identifier.
    pub id: String,
    /// The provider this window belongs to.
    pub provider_id: String,
    /// Sunday-first day of week.
    pub day_of_week: u8,
    /// Window start (inclusive).
    #[serde(with = "wall_time")]
    pub start_time: NaiveTime,
    /// Window end (exclusive).
    #[serde(with = "wall_time")]
    pub end_time: NaiveTime,
    /// Whether the window is bookable.
    #[serde(default = "default_true")]
    pub is_available: bool,
}

impl WeeklyAvailabilityWindow {
    /// Returns true if this window applies to `date` and is bookable.
    pub fn is_open_on(&self, date: NaiveDate) -> bool {
        self.is_available && self.day_of_week == day_of_week(date)
    }

    /// The concrete interval this window covers on `date`.
    ///
    /// Returns `None` when the window's end is not after its start, since
    /// such a window describes no bookable time.
    pub fn interval_on(&self, date: NaiveDate) -> Option<TimeInterval> {
        let interval =
            TimeInterval::try_new(date.and_time(self.start_time), date.and_time(self.end_time))?;
        (!interval.is_empty()).then_some(interval)
    }
}

/// Input for creating or replacing a weekly window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowInput {
    pub day_of_week: u8,
    #[serde(with = "wall_time")]
    pub start_time: NaiveTime,
    #[serde(with = "wall_time")]
    pub end_time: NaiveTime,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

impl WindowInput {
    /// Creates an available window input.
    pub fn new(day_of_week: u8, start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            day_of_week,
            start_time,
            end_time,
            is_available: true,
        }
    }

    /// Builder method to set availability.
    pub fn with_available(mut self, is_available: bool) -> Self {
        self.is_available = is_available;
        self
    }

    /// Checks that the day index is in range and the window is not empty.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.day_of_week > 6 {
            return Err("day_of_week must be between 0 (Sunday) and 6 (Saturday)");
        }
        if self.end_time <= self.start_time {
            return Err("end_time must be after start_time");
        }
        Ok(())
    }
}

/// A bookable, date-bound slot produced by the availability computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub date: NaiveDate,
    #[serde(with = "wall_time")]
    pub start_time: NaiveTime,
    #[serde(with = "wall_time")]
    pub end_time: NaiveTime,
    /// Always `true`: unavailable slots are omitted, never materialized.
    pub is_available: bool,
}

impl AvailabilitySlot {
    /// Creates a slot covering `window` on `date`.
    pub fn from_window(date: NaiveDate, window: &WeeklyAvailabilityWindow) -> Self {
        Self {
            date,
            start_time: window.start_time,
            end_time: window.end_time,
            is_available: true,
        }
    }

    /// The concrete interval covered by the slot.
    pub fn interval(&self) -> TimeInterval {
        TimeInterval::new(
            self.date.and_time(self.start_time),
            self.date.and_time(self.end_time),
        )
    }
}

/// Lifecycle status of an appointment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    /// Booked and occupying the provider's time.
    #[default]
    Scheduled,
    /// Cancelled. Terminal.
    Cancelled,
}

impl AppointmentStatus {
    /// Returns the stored string form of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns true if an appointment with this status blocks the calendar.
    pub fn is_occupying(&self) -> bool {
        matches!(self, Self::Scheduled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The internal booking record.
///
/// This record is the durable source of truth; `external_event_id` is
/// best-effort metadata set once the booking was mirrored to an external
/// calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub provider_id: String,
    pub client_id: String,
    pub client_name: String,
    pub client_email: String,
    #[serde(with = "wall_datetime")]
    pub scheduled_at: NaiveDateTime,
    pub duration_minutes: u32,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: AppointmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_event_id: Option<String>,
}

impl Appointment {
    /// The time this appointment occupies.
    pub fn interval(&self) -> BookedInterval {
        TimeInterval::from_minutes(self.scheduled_at, self.duration_minutes)
    }

    /// Returns true if the appointment was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.status == AppointmentStatus::Cancelled
    }
}

/// Payload for creating an appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentRequest {
    pub provider_id: String,
    pub client_id: String,
    pub client_name: String,
    pub client_email: String,
    #[serde(with = "wall_datetime")]
    pub scheduled_at: NaiveDateTime,
    pub duration_minutes: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

impl AppointmentRequest {
    /// Creates a request without notes.
    pub fn new(
        provider_id: impl Into<String>,
        client_id: impl Into<String>,
        client_name: impl Into<String>,
        client_email: impl Into<String>,
        scheduled_at: NaiveDateTime,
        duration_minutes: u32,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            client_id: client_id.into(),
            client_name: client_name.into(),
            client_email: client_email.into(),
            scheduled_at,
            duration_minutes,
            notes: None,
        }
    }

    /// Builder method to set notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// The time the requested appointment would occupy.
    pub fn interval(&self) -> BookedInterval {
        TimeInterval::from_minutes(self.scheduled_at, self.duration_minutes)
    }

    /// Validates the request payload.
    ///
    /// This does not check for overlapping bookings.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.provider_id.trim().is_empty() {
            return Err("provider_id is required");
        }
        if self.client_id.trim().is_empty() {
            return Err("client_id is required");
        }
        if self.duration_minutes == 0 {
            return Err("duration_minutes must be positive");
        }
        Ok(())
    }
}

/// Partial update of an appointment. Status is never changed by an update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentUpdate {
    #[serde(
        default,
        with = "wall_datetime::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub scheduled_at: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl AppointmentUpdate {
    /// Creates an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to move the appointment.
    pub fn with_scheduled_at(mut self, scheduled_at: NaiveDateTime) -> Self {
        self.scheduled_at = Some(scheduled_at);
        self
    }

    /// Builder method to change the duration.
    pub fn with_duration_minutes(mut self, minutes: u32) -> Self {
        self.duration_minutes = Some(minutes);
        self
    }

    /// Builder method to replace the notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Returns true if no field would change.
    pub fn is_empty(&self) -> bool {
        self.scheduled_at.is_none() && self.duration_minutes.is_none() && self.notes.is_none()
    }

    /// Validates the update payload.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.is_empty() {
            return Err("update must change at least one field");
        }
        if self.duration_minutes == Some(0) {
            return Err("duration_minutes must be positive");
        }
        Ok(())
    }
}
