//! PostgREST-backed record store.
//!
//! Collections map to tables under `/rest/v1/<collection>`. Filters use the
//! PostgREST query dialect (`column=op.value`), ordering uses
//! `order=a.asc,b.desc`, and writes ask for the affected rows back through
//! `Prefer: return=representation`.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, trace};

use slotbook_providers::BoxFuture;

use super::{Filter, FilterOp, Query, RecordStore, Row};
use crate::error::{StoreError, StoreResult};

const RETURN_REPRESENTATION: &str = "return=representation";

/// A [`RecordStore`] talking to a PostgREST endpoint.
#[derive(Debug, Clone)]
pub struct PostgrestStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PostgrestStore {
    /// Creates a store for the project at `base_url` (without `/rest/v1`).
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::backend(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn table_url(&self, collection: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, collection)
    }

    fn request(&self, method: Method, collection: &str) -> RequestBuilder {
        self.client
            .request(method, self.table_url(collection))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn execute(&self, request: RequestBuilder) -> StoreResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::backend(format!("request failed: {}", e)))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Http {
            status: status.as_u16(),
            message: body.trim().to_string(),
        })
    }

    async fn read_rows(&self, request: RequestBuilder) -> StoreResult<Vec<Row>> {
        let response = self.execute(request).await?;
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::backend(format!("failed to read response: {}", e)))?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&body)?)
    }
}

impl RecordStore for PostgrestStore {
    fn select<'a>(&'a self, query: &'a Query) -> BoxFuture<'a, StoreResult<Vec<Row>>> {
        Box::pin(async move {
            let params = select_params(query);
            trace!(collection = %query.collection, ?params, "postgrest select");
            let request = self
                .request(Method::GET, &query.collection)
                .query(&params);
            self.read_rows(request).await
        })
    }

    fn insert<'a>(
        &'a self,
        collection: &'a str,
        rows: Vec<Row>,
    ) -> BoxFuture<'a, StoreResult<Vec<Row>>> {
        Box::pin(async move {
            if rows.is_empty() {
                return Ok(Vec::new());
            }
            let request = self
                .request(Method::POST, collection)
                .header("Prefer", RETURN_REPRESENTATION)
                .json(&rows);
            let inserted = self.read_rows(request).await?;
            debug!(collection, rows = inserted.len(), "postgrest insert");
            Ok(inserted)
        })
    }

    fn update<'a>(
        &'a self,
        collection: &'a str,
        filters: &'a [Filter],
        patch: Row,
    ) -> BoxFuture<'a, StoreResult<Vec<Row>>> {
        Box::pin(async move {
            if filters.is_empty() {
                return Err(StoreError::query(collection, "refusing unfiltered update"));
            }
            let request = self
                .request(Method::PATCH, collection)
                .header("Prefer", RETURN_REPRESENTATION)
                .query(&filter_params(filters))
                .json(&patch);
            self.read_rows(request).await
        })
    }

    fn delete<'a>(
        &'a self,
        collection: &'a str,
        filters: &'a [Filter],
    ) -> BoxFuture<'a, StoreResult<usize>> {
        Box::pin(async move {
            if filters.is_empty() {
                return Err(StoreError::query(collection, "refusing unfiltered delete"));
            }
            let request = self
                .request(Method::DELETE, collection)
                .header("Prefer", RETURN_REPRESENTATION)
                .query(&filter_params(filters));
            Ok(self.read_rows(request).await?.len())
        })
    }
}

fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|f| (f.column.clone(), filter_expression(f)))
        .collect()
}

fn select_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    params.extend(filter_params(&query.filters));
    if !query.order.is_empty() {
        let order = query
            .order
            .iter()
            .map(|o| format!("{}.{}", o.column, if o.ascending { "asc" } else { "desc" }))
            .collect::<Vec<_>>()
            .join(",");
        params.push(("order".to_string(), order));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

/// Renders `op.value`. Null equality uses PostgREST's `is` operator.
fn filter_expression(filter: &Filter) -> String {
    match (&filter.value, filter.op) {
        (Value::Null, FilterOp::Eq) => "is.null".to_string(),
        (Value::Null, FilterOp::Neq) => "not.is.null".to_string(),
        (value, op) => format!("{}.{}", op.as_str(), literal(value)),
    }
}

fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}
