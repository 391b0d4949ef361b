//! Booking mutations.

use chrono::NaiveDateTime;

use slotbook_core::{AppointmentRequest, AppointmentUpdate};

use super::Session;
use crate::error::{CliError, CliResult};
use crate::render;

/// Fields of a new booking, as given on the command line.
#[derive(Debug, Clone)]
pub struct BookingArgs {
    pub client_id: String,
    pub name: String,
    pub email: String,
    pub at: NaiveDateTime,
    pub duration: u32,
    pub notes: Option<String>,
}

pub async fn book(session: &Session, provider_id: &str, args: BookingArgs) -> CliResult<String> {
    let mut request = AppointmentRequest::new(
        provider_id,
        args.client_id,
        args.name,
        args.email,
        args.at,
        args.duration,
    );
    request.notes = args.notes;

    let outcome = session
        .orchestrator()
        .create_appointment_outcome(&request)
        .await?;
    session.save().await?;
    render::outcome(&outcome, session.format)
}

pub async fn reschedule(
    session: &Session,
    appointment_id: &str,
    provider_id: &str,
    update: AppointmentUpdate,
) -> CliResult<String> {
    let updated = session
        .orchestrator()
        .update_appointment(appointment_id, provider_id, &update)
        .await;
    if !updated {
        return Err(CliError::Rejected(format!(
            "appointment {} was not updated",
            appointment_id
        )));
    }
    session.save().await?;
    Ok(format!("updated appointment {}", appointment_id))
}

pub async fn cancel(
    session: &Session,
    appointment_id: &str,
    provider_id: &str,
) -> CliResult<String> {
    let cancelled = session
        .orchestrator()
        .cancel_appointment(appointment_id, provider_id)
        .await;
    if !cancelled {
        return Err(CliError::Rejected(format!(
            "appointment {} was not cancelled",
            appointment_id
        )));
    }
    session.save().await?;
    Ok(format!("cancelled appointment {}", appointment_id))
}
