//! Stored calendar credentials.
//!
//! Credentials are obtained elsewhere (OAuth consent happens outside this
//! workspace) and persisted per provider and integration. The clients here
//! only read them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use slotbook_core::IntegrationMode;

use crate::error::{ProviderError, ProviderResult};

/// Credentials for one provider's calendar integration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarCredentials {
    /// The provider these credentials belong to.
    pub provider_id: String,
    /// Which integration these credentials are for.
    pub integration: IntegrationMode,
    /// Bearer token for the remote API.
    pub access_token: String,
    /// Calendar to read and write. Defaults to the account's primary calendar.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_id: Option<String>,
    /// Calendly user URI (`https://api.calendly.com/users/...`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_uri: Option<String>,
    /// Calendly event type URI used when booking invitees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type_uri: Option<String>,
    /// When the access token stops being valid, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CalendarCredentials {
    /// Creates credentials holding just an access token.
    pub fn new(
        provider_id: impl Into<String>,
        integration: IntegrationMode,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            integration,
            access_token: access_token.into(),
            calendar_id: None,
            user_uri: None,
            event_type_uri: None,
            expires_at: None,
        }
    }

    /// Builder method to set the calendar identifier.
    pub fn with_calendar_id(mut self, calendar_id: impl Into<String>) -> Self {
        self.calendar_id = Some(calendar_id.into());
        self
    }

    /// Builder method to set the Calendly user URI.
    pub fn with_user_uri(mut self, uri: impl Into<String>) -> Self {
        self.user_uri = Some(uri.into());
        self
    }

    /// Builder method to set the Calendly event type URI.
    pub fn with_event_type_uri(mut self, uri: impl Into<String>) -> Self {
        self.event_type_uri = Some(uri.into());
        self
    }

    /// Builder method to set the token expiry.
    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Returns true if the token is known to have expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }

    /// Returns true if the token is known to have expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Returns true if the access token is usable at all.
    pub fn has_token(&self) -> bool {
        !self.access_token.trim().is_empty()
    }

    /// The calendar identifier, or `fallback` when none is stored.
    pub fn calendar_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.calendar_id.as_deref().unwrap_or(fallback)
    }

    /// Returns the Calendly user URI or a configuration error.
    pub fn require_user_uri(&self) -> ProviderResult<&str> {
        self.user_uri
            .as_deref()
            .ok_or_else(|| ProviderError::configuration("calendly credentials lack user_uri"))
    }

    /// Returns the Calendly event type URI or a configuration error.
    pub fn require_event_type_uri(&self) -> ProviderResult<&str> {
        self.event_type_uri.as_deref().ok_or_else(|| {
            ProviderError::configuration("calendly credentials lack event_type_uri")
        })
    }
}

// Keep tokens out of logs.
impl std::fmt::Debug for CalendarCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalendarCredentials")
            .field("provider_id", &self.provider_id)
            .field("integration", &self.integration)
            .field("access_token", &"<redacted>")
            .field("calendar_id", &self.calendar_id)
            .field("user_uri", &self.user_uri)
            .field("event_type_uri", &self.event_type_uri)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
