//! Shared HTTP plumbing for the provider clients.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::error::{ProviderError, ProviderResult};

/// Default timeout applied to every remote request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("slotbook/", env!("CARGO_PKG_VERSION"));

/// Builds the reqwest client used by a calendar client.
pub(crate) fn build_client(timeout: Duration) -> ProviderResult<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| ProviderError::internal(format!("failed to create HTTP client: {}", e)))
}

/// Sends a request, mapping transport failures to provider errors.
pub(crate) async fn send(request: RequestBuilder) -> ProviderResult<Response> {
    request.send().await.map_err(|e| {
        if e.is_timeout() {
            ProviderError::timeout("request timeout").with_source(e)
        } else if e.is_connect() {
            ProviderError::network(format!("connection failed: {}", e))
        } else {
            ProviderError::network(format!("request failed: {}", e))
        }
    })
}

/// Fails with a status-derived error unless the response is a success.
pub(crate) async fn ensure_success(response: Response) -> ProviderResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::from_status(status.as_u16(), &body))
}

/// Checks the status and parses a JSON body.
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> ProviderResult<T> {
    let response = ensure_success(response).await?;
    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;
    trace!(bytes = body.len(), "received response body");
    parse_json(&body)
}

/// Parses a JSON body into `T`.
pub(crate) fn parse_json<T: DeserializeOwned>(body: &str) -> ProviderResult<T> {
    serde_json::from_str(body)
        .map_err(|e| ProviderError::invalid_response(format!("failed to parse response: {}", e)))
}

/// Returns true for statuses that mean the remote event is already gone.
pub(crate) fn is_gone(status: StatusCode) -> bool {
    status == StatusCode::NOT_FOUND || status == StatusCode::GONE
}

/// Joins an API base URL and a path without doubling slashes.
pub(crate) fn join(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
