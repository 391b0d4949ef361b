//! Google Calendar client.
//!
//! Talks to the Calendar API v3 with a bearer token taken from the stored
//! [`CalendarCredentials`](crate::CalendarCredentials):
//!
//! - busy time via `POST /freeBusy`
//! - mirrored appointments via `calendars/{id}/events` (insert, patch, delete)
//!
//! Token acquisition and refresh happen outside this crate.

mod client;

pub use client::{CALENDAR_API_BASE, GoogleCalendarClient};
