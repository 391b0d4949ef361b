//! Command-line interface definition.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::{Parser, Subcommand};

use slotbook_core::{IntegrationMode, parse_date, parse_wall_datetime, parse_wall_time};

/// slotbook - provider availability and bookings
#[derive(Debug, Parser)]
#[command(name = "slotbook")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "SLOTBOOK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List bookable slots between two dates (inclusive)
    Slots {
        provider: String,
        #[arg(value_parser = parse_date)]
        start: NaiveDate,
        /// Last date, defaults to `start`
        #[arg(value_parser = parse_date)]
        end: Option<NaiveDate>,
    },

    /// Show a provider's weekly template
    Template { provider: String },

    /// Add a window to a provider's weekly template
    AddWindow {
        provider: String,
        /// Day of week, 0 = Sunday ... 6 = Saturday
        #[arg(value_parser = clap::value_parser!(u8).range(0..=6))]
        day: u8,
        /// Start time (HH:MM)
        #[arg(value_parser = parse_wall_time)]
        start: NaiveTime,
        /// End time (HH:MM), exclusive
        #[arg(value_parser = parse_wall_time)]
        end: NaiveTime,
        /// Store the window as not bookable
        #[arg(long)]
        unavailable: bool,
    },

    /// Remove a window from a provider's weekly template
    RemoveWindow { provider: String, window: String },

    /// Book an appointment
    Book {
        provider: String,
        #[arg(long)]
        client_id: String,
        /// Client display name
        #[arg(long)]
        name: String,
        /// Client email address
        #[arg(long)]
        email: String,
        /// Start (YYYY-MM-DDTHH:MM)
        #[arg(long, value_parser = parse_wall_datetime)]
        at: NaiveDateTime,
        /// Duration in minutes
        #[arg(long, default_value = "30")]
        duration: u32,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Move or edit an appointment
    Reschedule {
        appointment: String,
        provider: String,
        /// New start (YYYY-MM-DDTHH:MM)
        #[arg(long, value_parser = parse_wall_datetime)]
        at: Option<NaiveDateTime>,
        /// New duration in minutes
        #[arg(long)]
        duration: Option<u32>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Cancel an appointment
    Cancel {
        appointment: String,
        provider: String,
    },

    /// Show or set the calendar integration of a provider
    Mode {
        provider: String,
        /// New mode: manual, google_calendar, office365_calendar, calendly
        #[arg(long)]
        set: Option<IntegrationMode>,
    },

    /// Store calendar credentials for a provider
    Connect {
        provider: String,
        /// Integration the credentials belong to
        integration: IntegrationMode,
        /// Access token (supports `pass::` and `env::` prefixes)
        #[arg(long, env = "SLOTBOOK_ACCESS_TOKEN")]
        token: String,
        /// Calendar to read and write, defaults to the primary calendar
        #[arg(long)]
        calendar_id: Option<String>,
        /// Calendly user URI
        #[arg(long)]
        user_uri: Option<String>,
        /// Calendly event type URI used for bookings
        #[arg(long)]
        event_type_uri: Option<String>,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_slots_with_single_date() {
        let cli = Cli::try_parse_from(["slotbook", "slots", "p1", "2025-03-03"]).unwrap();
        match cli.command {
            Command::Slots { provider, start, end } => {
                assert_eq!(provider, "p1");
                assert_eq!(start, NaiveDate::from_ymd_opt(2025, 3, 3).unwrap());
                assert!(end.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn rejects_out_of_range_day() {
        let result = Cli::try_parse_from(["slotbook", "add-window", "p1", "7", "09:00", "12:00"]);
        assert!(result.is_err());
    }

    #[test]
    fn parses_mode_names() {
        let cli =
            Cli::try_parse_from(["slotbook", "mode", "p1", "--set", "office365_calendar"]).unwrap();
        match cli.command {
            Command::Mode { set, .. } => assert_eq!(set, Some(IntegrationMode::Office365Calendar)),
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(Cli::try_parse_from(["slotbook", "mode", "p1", "--set", "outlook"]).is_err());
    }

    #[test]
    fn parses_booking() {
        let cli = Cli::try_parse_from([
            "slotbook",
            "book",
            "p1",
            "--client-id",
            "c1",
            "--name",
            "Ada",
            "--email",
            "ada@example.com",
            "--at",
            "2025-03-03T10:00",
        ])
        .unwrap();
        match cli.command {
            Command::Book { at, duration, notes, .. } => {
                assert_eq!(at.to_string(), "2025-03-03 10:00:00");
                assert_eq!(duration, 30);
                assert!(notes.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
