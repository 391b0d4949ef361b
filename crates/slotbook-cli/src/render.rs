//! Output rendering for command results.
//!
//! Every renderer produces either aligned terminal text or pretty JSON.

use std::fmt::Write;

use serde::Serialize;

use slotbook_core::{AvailabilitySlot, IntegrationMode, WeeklyAvailabilityWindow};
use slotbook_engine::MutationOutcome;

use crate::error::CliResult;

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// The output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable terminal output.
    #[default]
    Text,
    /// Machine-readable JSON output.
    Json,
}

impl OutputFormat {
    pub fn from_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Text }
    }
}

fn json<T: Serialize + ?Sized>(value: &T) -> CliResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn day_name(day_of_week: u8) -> &'static str {
    DAY_NAMES.get(day_of_week as usize).copied().unwrap_or("???")
}

pub fn slots(slots: &[AvailabilitySlot], format: OutputFormat) -> CliResult<String> {
    if format == OutputFormat::Json {
        return json(slots);
    }
    if slots.is_empty() {
        return Ok("No available slots".to_string());
    }
    let mut out = String::new();
    for slot in slots {
        let _ = writeln!(
            out,
            "{} {}  {}-{}",
            slot.date.format("%Y-%m-%d"),
            slot.date.format("%a"),
            slot.start_time.format("%H:%M"),
            slot.end_time.format("%H:%M"),
        );
    }
    Ok(out.trim_end().to_string())
}

pub fn windows(windows: &[WeeklyAvailabilityWindow], format: OutputFormat) -> CliResult<String> {
    if format == OutputFormat::Json {
        return json(windows);
    }
    if windows.is_empty() {
        return Ok("No weekly windows".to_string());
    }
    let mut out = String::new();
    for window in windows {
        let _ = write!(
            out,
            "{}  {}-{}  {}",
            day_name(window.day_of_week),
            window.start_time.format("%H:%M"),
            window.end_time.format("%H:%M"),
            window.id,
        );
        if !window.is_available {
            out.push_str("  (unavailable)");
        }
        out.push('\n');
    }
    Ok(out.trim_end().to_string())
}

pub fn window(window: &WeeklyAvailabilityWindow, format: OutputFormat) -> CliResult<String> {
    self::windows(std::slice::from_ref(window), format)
}

pub fn outcome(outcome: &MutationOutcome, format: OutputFormat) -> CliResult<String> {
    #[derive(Serialize)]
    struct Rendered<'a> {
        appointment: &'a slotbook_core::Appointment,
        external: String,
    }

    if format == OutputFormat::Json {
        return json(&Rendered {
            appointment: &outcome.internal,
            external: outcome.external.to_string(),
        });
    }
    let appointment = &outcome.internal;
    let mut out = format!(
        "{}  {}  {} min  {}  {} <{}>",
        appointment.id,
        appointment.scheduled_at.format("%Y-%m-%d %H:%M"),
        appointment.duration_minutes,
        appointment.status.as_str(),
        appointment.client_name,
        appointment.client_email,
    );
    let _ = write!(out, "\ncalendar: {}", outcome.external);
    if let Some(ref event_id) = appointment.external_event_id {
        let _ = write!(out, " ({})", event_id);
    }
    Ok(out)
}

pub fn mode(provider_id: &str, mode: IntegrationMode, format: OutputFormat) -> CliResult<String> {
    if format == OutputFormat::Json {
        return json(&serde_json::json!({
            "provider_id": provider_id,
            "calendar_integration": mode,
        }));
    }
    Ok(format!("{}: {}", provider_id, mode))
}
