//! CalendarClient trait and implementations.
//!
//! This crate provides the boundary to the external calendars a provider can
//! link their availability to:
//!
//! - [`CalendarClient`] - The trait every remote calendar client implements
//! - [`CalendarCredentials`] - Stored access token and calendar identifiers
//! - [`ProviderError`] - Error types for remote calendar operations
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  ┌──────────────────┐  ┌──────────────┐
//! │ Google API   │  │ Microsoft Graph  │  │ Calendly API │
//! └──────┬───────┘  └────────┬─────────┘  └──────┬───────┘
//!        │                   │                   │
//!        ▼                   ▼                   ▼
//! ┌──────────────┐  ┌──────────────────┐  ┌──────────────┐
//! │ GoogleCal... │  │ Office365Cal...  │  │ CalendlyCl.. │
//! └──────┬───────┘  └────────┬─────────┘  └──────┬───────┘
//!        │                   │                   │
//!        └─────────── CalendarClient ────────────┘
//!                            │
//!                            ▼
//!                busy intervals / event ids
//! ```
//!
//! # Example
//!
//! ```ignore
//! use slotbook_providers::{CalendarClient, GoogleCalendarClient, DEFAULT_TIMEOUT};
//!
//! let client = GoogleCalendarClient::new(DEFAULT_TIMEOUT)?;
//! let busy = client.fetch_busy_intervals(&credentials, range).await?;
//! ```

pub mod calendly;
pub mod client;
pub mod credentials;
pub mod error;
pub mod google;
mod http;
pub mod office365;

// Re-export main types at crate root
pub use calendly::CalendlyClient;
pub use client::{BoxFuture, CalendarClient, ErrorClient};
pub use credentials::CalendarCredentials;
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use google::GoogleCalendarClient;
pub use http::DEFAULT_TIMEOUT;
pub use office365::Office365CalendarClient;
