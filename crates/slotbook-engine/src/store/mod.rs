//! Record store gateway.
//!
//! The engine talks to persistence through [`RecordStore`], a small query
//! interface over JSON rows grouped in named collections. Two backends exist:
//!
//! - [`MemoryStore`]: in-process, optionally snapshotted to a JSON file
//! - [`PostgrestStore`]: a hosted relational database behind PostgREST

mod memory;
mod postgrest;

use std::cmp::Ordering;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use slotbook_providers::BoxFuture;

use crate::config::{StoreKind, StoreSettings};
use crate::error::{EngineError, EngineResult, StoreResult};

pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;

/// A stored record.
pub type Row = serde_json::Map<String, Value>;

/// Comparison applied by a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl FilterOp {
    /// The PostgREST operator name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
        }
    }
}

/// A single column condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn new(column: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Eq, value)
    }

    /// Returns true if `row` satisfies this condition.
    ///
    /// A missing column reads as `null`. Ordering comparisons against
    /// values of different types never match.
    pub fn matches(&self, row: &Row) -> bool {
        let actual = row.get(&self.column).unwrap_or(&Value::Null);
        match self.op {
            FilterOp::Eq => values_equal(actual, &self.value),
            FilterOp::Neq => !values_equal(actual, &self.value),
            FilterOp::Gt => compare_values(actual, &self.value) == Some(Ordering::Greater),
            FilterOp::Gte => matches!(
                compare_values(actual, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOp::Lt => compare_values(actual, &self.value) == Some(Ordering::Less),
            FilterOp::Lte => matches!(
                compare_values(actual, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
        }
    }
}

/// Sort key for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// A read against one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub limit: Option<usize>,
}

impl Query {
    /// Starts a query over `collection` with no conditions.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Filter::new(column, FilterOp::Eq, value))
    }

    pub fn neq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Filter::new(column, FilterOp::Neq, value))
    }

    pub fn gt(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Filter::new(column, FilterOp::Gt, value))
    }

    pub fn gte(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Filter::new(column, FilterOp::Gte, value))
    }

    pub fn lt(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Filter::new(column, FilterOp::Lt, value))
    }

    pub fn lte(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Filter::new(column, FilterOp::Lte, value))
    }

    /// Adds an ascending sort key. Keys apply in the order they are added.
    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order.push(Order {
            column: column.into(),
            ascending: true,
        });
        self
    }

    pub fn order_by_desc(mut self, column: impl Into<String>) -> Self {
        self.order.push(Order {
            column: column.into(),
            ascending: false,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns true if `row` satisfies every filter.
    pub fn matches(&self, row: &Row) -> bool {
        self.filters.iter().all(|f| f.matches(row))
    }

    /// Orders rows by the query's sort keys. Missing values sort last.
    pub fn sort(&self, rows: &mut [Row]) {
        if self.order.is_empty() {
            return;
        }
        rows.sort_by(|a, b| {
            for key in &self.order {
                let left = a.get(&key.column).filter(|v| !v.is_null());
                let right = b.get(&key.column).filter(|v| !v.is_null());
                let ordering = match (left, right) {
                    (None, None) => Ordering::Equal,
                    (None, Some(_)) => Ordering::Greater,
                    (Some(_), None) => Ordering::Less,
                    (Some(l), Some(r)) => {
                        let ord = compare_values(l, r).unwrap_or(Ordering::Equal);
                        if key.ascending { ord } else { ord.reverse() }
                    }
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }
}

/// Persistence boundary for availability templates, bookings, provider
/// profiles and calendar credentials.
///
/// Backends must not apply `update` or `delete` without filters.
pub trait RecordStore: Send + Sync {
    /// Returns the rows matching `query`, ordered and limited as requested.
    fn select<'a>(&'a self, query: &'a Query) -> BoxFuture<'a, StoreResult<Vec<Row>>>;

    /// Returns the first row matching `query`, if any.
    fn select_single<'a>(&'a self, query: &'a Query) -> BoxFuture<'a, StoreResult<Option<Row>>> {
        let query = query.clone().limit(1);
        Box::pin(async move { Ok(self.select(&query).await?.into_iter().next()) })
    }

    /// Inserts rows and returns them as stored (with ids assigned).
    fn insert<'a>(
        &'a self,
        collection: &'a str,
        rows: Vec<Row>,
    ) -> BoxFuture<'a, StoreResult<Vec<Row>>>;

    /// Merges `patch` into every row matching `filters` and returns the
    /// updated rows.
    fn update<'a>(
        &'a self,
        collection: &'a str,
        filters: &'a [Filter],
        patch: Row,
    ) -> BoxFuture<'a, StoreResult<Vec<Row>>>;

    /// Deletes the rows matching `filters` and returns how many went away.
    fn delete<'a>(
        &'a self,
        collection: &'a str,
        filters: &'a [Filter],
    ) -> BoxFuture<'a, StoreResult<usize>>;
}

/// An opened store plus what is needed to persist it.
pub struct StoreHandle {
    store: Arc<dyn RecordStore>,
    snapshot: Option<(Arc<MemoryStore>, PathBuf)>,
}

impl StoreHandle {
    /// Opens the store described by `settings`.
    ///
    /// A `file` store is loaded from its snapshot (an absent file is an empty
    /// store); a `postgrest` store needs `url` and `api_key`.
    pub async fn open(settings: &StoreSettings) -> EngineResult<Self> {
        match settings.kind {
            StoreKind::File => {
                let path = settings.snapshot_path();
                let memory = Arc::new(MemoryStore::load(&path).await?);
                debug!(path = %path.display(), "opened file store");
                Ok(Self {
                    store: memory.clone(),
                    snapshot: Some((memory, path)),
                })
            }
            StoreKind::Memory => Ok(Self {
                store: Arc::new(MemoryStore::new()),
                snapshot: None,
            }),
            StoreKind::Postgrest => {
                let url = settings
                    .url
                    .as_deref()
                    .ok_or_else(|| EngineError::config("postgrest store requires `url`"))?;
                let api_key = settings
                    .api_key
                    .as_deref()
                    .ok_or_else(|| EngineError::config("postgrest store requires `api_key`"))?;
                let store = PostgrestStore::new(url, api_key, settings.request_timeout())?;
                debug!(url, "opened postgrest store");
                Ok(Self {
                    store: Arc::new(store),
                    snapshot: None,
                })
            }
        }
    }

    /// Wraps an existing store that needs no persistence step.
    pub fn from_store(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            snapshot: None,
        }
    }

    pub fn store(&self) -> Arc<dyn RecordStore> {
        self.store.clone()
    }

    /// Writes the file snapshot back, if this is a file store.
    pub async fn persist(&self) -> EngineResult<()> {
        if let Some((memory, path)) = &self.snapshot {
            memory.save(path).await?;
            debug!(path = %path.display(), "saved file store");
        }
        Ok(())
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Orders two JSON scalars of the same kind.
///
/// Strings compare lexically, which is correct for the zero-padded
/// `YYYY-MM-DDTHH:MM:SS` and `HH:MM` forms stored by the engine.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn filter_ops() {
        let r = row(json!({"day_of_week": 1, "start_time": "09:00", "status": "scheduled"}));

        assert!(Filter::eq("day_of_week", 1).matches(&r));
        assert!(Filter::new("day_of_week", FilterOp::Neq, 2).matches(&r));
        assert!(Filter::new("start_time", FilterOp::Gte, "09:00").matches(&r));
        assert!(Filter::new("start_time", FilterOp::Lt, "10:00").matches(&r));
        assert!(!Filter::new("start_time", FilterOp::Gt, "09:00").matches(&r));
        assert!(Filter::new("start_time", FilterOp::Lte, "09:00").matches(&r));
    }

    #[test]
    fn missing_column_is_null() {
        let r = row(json!({"id": "a"}));
        assert!(Filter::eq("notes", Value::Null).matches(&r));
        assert!(!Filter::eq("notes", "x").matches(&r));
        assert!(!Filter::new("notes", FilterOp::Gt, "a").matches(&r));
    }

    #[test]
    fn integer_and_float_compare_equal() {
        let r = row(json!({"duration_minutes": 30}));
        assert!(Filter::eq("duration_minutes", json!(30.0)).matches(&r));
    }

    #[test]
    fn multi_column_sort() {
        let mut rows = vec![
            row(json!({"day_of_week": 2, "start_time": "09:00"})),
            row(json!({"day_of_week": 1, "start_time": "14:00"})),
            row(json!({"day_of_week": 1, "start_time": "09:00"})),
            row(json!({"start_time": "08:00"})),
        ];
        Query::new("availability_settings")
            .order_by("day_of_week")
            .order_by("start_time")
            .sort(&mut rows);

        let keys: Vec<_> = rows
            .iter()
            .map(|r| (r.get("day_of_week").cloned(), r["start_time"].clone()))
            .collect();
        assert_eq!(keys[0], (Some(json!(1)), json!("09:00")));
        assert_eq!(keys[1], (Some(json!(1)), json!("14:00")));
        assert_eq!(keys[2], (Some(json!(2)), json!("09:00")));
        assert_eq!(keys[3].0, None);
    }

    #[test]
    fn descending_sort() {
        let mut rows = vec![row(json!({"n": 1})), row(json!({"n": 3})), row(json!({"n": 2}))];
        Query::new("x").order_by_desc("n").sort(&mut rows);
        let ns: Vec<_> = rows.iter().map(|r| r["n"].as_i64().unwrap()).collect();
        assert_eq!(ns, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn file_handle_persists_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let settings = StoreSettings::file(dir.path().join("store.json"));

        let handle = StoreHandle::open(&settings).await.unwrap();
        handle
            .store()
            .insert("provider_profiles", vec![row(json!({"id": "p1"}))])
            .await
            .unwrap();
        handle.persist().await.unwrap();

        let reopened = StoreHandle::open(&settings).await.unwrap();
        let rows = reopened
            .store()
            .select(&Query::new("provider_profiles"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn postgrest_handle_requires_url() {
        let settings = StoreSettings {
            kind: StoreKind::Postgrest,
            ..StoreSettings::default()
        };
        let err = StoreHandle::open(&settings).await.err().unwrap();
        assert!(matches!(err, EngineError::Config { .. }));
    }
}
