//! slotbook CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use slotbook_cli::cli::{Cli, Command, ConfigAction};
use slotbook_cli::commands::bookings::BookingArgs;
use slotbook_cli::commands::provider::ConnectArgs;
use slotbook_cli::commands::{self, Session};
use slotbook_cli::config::CliConfig;
use slotbook_cli::error::CliResult;
use slotbook_cli::render::OutputFormat;
use slotbook_core::{AppointmentUpdate, TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_tracing(TracingConfig::cli(cli.debug || config.debug)) {
        eprintln!("warning: {}", e);
    }

    match run(cli, config).await {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> CliResult<CliConfig> {
    match cli.config {
        Some(ref path) => CliConfig::load_from(path),
        None => CliConfig::load(),
    }
}

async fn run(cli: Cli, config: CliConfig) -> CliResult<String> {
    let config_path = cli.config.clone().unwrap_or_else(CliConfig::default_path);

    if let Command::Config { action } = cli.command {
        return match action {
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
            ConfigAction::Path => commands::config::path(&config, &config_path),
        };
    }

    let engine = config.resolved_engine()?;
    let session = Session::open(&engine, OutputFormat::from_flag(cli.json)).await?;

    match cli.command {
        Command::Slots {
            provider,
            start,
            end,
        } => commands::availability::slots(&session, &provider, start, end).await,
        Command::Template { provider } => {
            commands::availability::template(&session, &provider).await
        }
        Command::AddWindow {
            provider,
            day,
            start,
            end,
            unavailable,
        } => {
            commands::availability::add_window(&session, &provider, day, start, end, !unavailable)
                .await
        }
        Command::RemoveWindow { provider, window } => {
            commands::availability::remove_window(&session, &provider, &window).await
        }
        Command::Book {
            provider,
            client_id,
            name,
            email,
            at,
            duration,
            notes,
        } => {
            let args = BookingArgs {
                client_id,
                name,
                email,
                at,
                duration,
                notes,
            };
            commands::bookings::book(&session, &provider, args).await
        }
        Command::Reschedule {
            appointment,
            provider,
            at,
            duration,
            notes,
        } => {
            let update = AppointmentUpdate {
                scheduled_at: at,
                duration_minutes: duration,
                notes,
            };
            commands::bookings::reschedule(&session, &appointment, &provider, update).await
        }
        Command::Cancel {
            appointment,
            provider,
        } => commands::bookings::cancel(&session, &appointment, &provider).await,
        Command::Mode { provider, set } => {
            commands::provider::mode(&session, &provider, set).await
        }
        Command::Connect {
            provider,
            integration,
            token,
            calendar_id,
            user_uri,
            event_type_uri,
        } => {
            let args = ConnectArgs {
                integration,
                token,
                calendar_id,
                user_uri,
                event_type_uri,
            };
            commands::provider::connect(&session, &provider, args).await
        }
        Command::Config { .. } => Ok(String::new()),
    }
}
