//! Error types for calendar provider operations.
//!
//! Every failure talking to Google Calendar, Microsoft Graph or Calendly is
//! reported as a [`ProviderError`]. The engine never surfaces these to its
//! callers; they decide between falling back and skipping the mirror.

use std::fmt;
use thiserror::Error;

/// The category of a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// Credentials are invalid, expired, or revoked (401).
    AuthenticationFailed,
    /// Credentials are valid but lack permission (403).
    AuthorizationFailed,
    /// Connection failed, DNS resolution, TLS, etc.
    NetworkError,
    /// The call did not complete within its deadline.
    Timeout,
    /// Too many requests (429).
    RateLimited,
    /// The remote service returned a 5xx status.
    ServerError,
    /// The response could not be parsed or lacked required fields.
    InvalidResponse,
    /// The remote event or calendar does not exist (404 / 410).
    NotFound,
    /// The request was rejected as malformed (400 / 422).
    BadRequest,
    /// The stored credentials lack a field this provider needs.
    ConfigurationError,
    /// The provider API has no equivalent for the requested operation.
    Unsupported,
    /// Unexpected state inside the client.
    InternalError,
}

impl ProviderErrorCode {
    /// Returns true if this error is transient.
    ///
    /// Nothing in slotbook retries; this is informational for callers and logs.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::Timeout | Self::RateLimited | Self::ServerError
        )
    }

    /// Returns a stable snake-case name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuthorizationFailed => "authorization_failed",
            Self::NetworkError => "network_error",
            Self::Timeout => "timeout",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::ConfigurationError => "configuration_error",
            Self::Unsupported => "unsupported",
            Self::InternalError => "internal_error",
        }
    }

    /// Maps an HTTP status code to an error code.
    ///
    /// Returns `None` for success codes.
    pub fn from_http_status(status: u16) -> Option<Self> {
        match status {
            200..=399 => None,
            401 => Some(Self::AuthenticationFailed),
            403 => Some(Self::AuthorizationFailed),
            404 | 410 => Some(Self::NotFound),
            408 => Some(Self::Timeout),
            429 => Some(Self::RateLimited),
            400 | 409 | 422 => Some(Self::BadRequest),
            500..=599 => Some(Self::ServerError),
            _ => Some(Self::InvalidResponse),
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error that occurred while interacting with a calendar provider.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    /// The provider that generated this error (e.g., "google_calendar").
    provider: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    /// Creates a new provider error with the given code and message.
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            source: None,
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationFailed, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Timeout, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Unsupported, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InternalError, message)
    }

    /// Creates an error from a non-success HTTP status and response body.
    pub fn from_status(status: u16, body: &str) -> Self {
        let code =
            ProviderErrorCode::from_http_status(status).unwrap_or(ProviderErrorCode::InternalError);
        let body = body.trim();
        let message = if body.is_empty() {
            format!("HTTP {}", status)
        } else {
            format!("HTTP {}: {}", status, truncate(body, 300))
        };
        Self::new(code, message)
    }

    /// Sets the provider name for this error.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    pub fn is_transient(&self) -> bool {
        self.code.is_transient()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref provider) = self.provider {
            write!(f, "[{}] ", provider)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
