//! Provider integration settings.

use tracing::info;

use slotbook_core::IntegrationMode;
use slotbook_providers::CalendarCredentials;

use super::Session;
use crate::error::{CliError, CliResult};
use crate::{render, secret};

/// Shows the resolved integration mode, or sets it when `set` is given.
pub async fn mode(
    session: &Session,
    provider_id: &str,
    set: Option<IntegrationMode>,
) -> CliResult<String> {
    let orchestrator = session.orchestrator();
    if let Some(mode) = set {
        orchestrator
            .repository()
            .set_integration_mode(provider_id, mode)
            .await?;
        session.save().await?;
        info!(provider_id, mode = %mode, "integration mode updated");
    }
    let resolved = orchestrator.resolve_mode(provider_id).await;
    render::mode(provider_id, resolved, session.format)
}

/// Calendar credentials given on the command line.
#[derive(Debug, Clone)]
pub struct ConnectArgs {
    pub integration: IntegrationMode,
    pub token: String,
    pub calendar_id: Option<String>,
    pub user_uri: Option<String>,
    pub event_type_uri: Option<String>,
}

/// Stores calendar credentials for the provider.
pub async fn connect(session: &Session, provider_id: &str, args: ConnectArgs) -> CliResult<String> {
    if !args.integration.is_external() {
        return Err(CliError::Rejected(
            "manual mode does not use calendar credentials".to_string(),
        ));
    }

    let token = secret::resolve(&args.token)?;
    let mut credentials = CalendarCredentials::new(provider_id, args.integration, token);
    credentials.calendar_id = args.calendar_id;
    credentials.user_uri = args.user_uri;
    credentials.event_type_uri = args.event_type_uri;

    session
        .orchestrator()
        .repository()
        .save_credentials(&credentials)
        .await?;
    session.save().await?;
    Ok(format!("stored {} credentials for {}", args.integration, provider_id))
}
