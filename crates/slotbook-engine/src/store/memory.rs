//! In-process record store.

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use slotbook_providers::BoxFuture;

use super::{Filter, Query, RecordStore, Row};
use crate::error::{StoreError, StoreResult};

type Collections = HashMap<String, Vec<Row>>;

/// A [`RecordStore`] kept in memory.
///
/// Rows without an `id` get a random UUID on insert. The whole store can be
/// written to and read from a JSON snapshot file, which is how the CLI gets
/// a file-backed store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a collection map.
    pub fn from_collections(collections: Collections) -> Self {
        Self {
            collections: RwLock::new(collections),
        }
    }

    /// Loads a snapshot written by [`save`](Self::save).
    ///
    /// A missing file yields an empty store.
    pub async fn load(path: &Path) -> StoreResult<Self> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no snapshot yet, starting empty");
                return Ok(Self::new());
            }
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Self::new());
        }
        let collections: Collections = serde_json::from_str(&content)?;
        Ok(Self::from_collections(collections))
    }

    /// Writes the store to `path` as pretty JSON.
    ///
    /// The file is replaced through a rename so a crash never leaves a
    /// truncated snapshot behind.
    pub async fn save(&self, path: &Path) -> StoreResult<()> {
        let content = {
            let collections = self.collections.read().await;
            serde_json::to_string_pretty(&*collections)?
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Returns a copy of every collection.
    pub async fn snapshot(&self) -> Collections {
        self.collections.read().await.clone()
    }
}

fn assign_id(row: &mut Row) {
    if row.get("id").is_none_or(Value::is_null) {
        row.insert(
            "id".to_string(),
            Value::String(uuid::Uuid::new_v4().to_string()),
        );
    }
}

impl RecordStore for MemoryStore {
    fn select<'a>(&'a self, query: &'a Query) -> BoxFuture<'a, StoreResult<Vec<Row>>> {
        Box::pin(async move {
            let collections = self.collections.read().await;
            let mut rows: Vec<Row> = collections
                .get(&query.collection)
                .map(|rows| rows.iter().filter(|r| query.matches(r)).cloned().collect())
                .unwrap_or_default();
            drop(collections);

            query.sort(&mut rows);
            if let Some(limit) = query.limit {
                rows.truncate(limit);
            }
            trace!(collection = %query.collection, rows = rows.len(), "memory select");
            Ok(rows)
        })
    }

    fn insert<'a>(
        &'a self,
        collection: &'a str,
        rows: Vec<Row>,
    ) -> BoxFuture<'a, StoreResult<Vec<Row>>> {
        Box::pin(async move {
            let mut inserted = Vec::with_capacity(rows.len());
            let mut collections = self.collections.write().await;
            let target = collections.entry(collection.to_string()).or_default();
            for mut row in rows {
                assign_id(&mut row);
                target.push(row.clone());
                inserted.push(row);
            }
            trace!(collection, rows = inserted.len(), "memory insert");
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
            let mut collections = self.collections.write().await;
            let mut updated = Vec::new();
            if let Some(rows) = collections.get_mut(collection) {
                for row in rows
                    .iter_mut()
                    .filter(|r| filters.iter().all(|f| f.matches(r)))
                {
                    for (key, value) in &patch {
                        row.insert(key.clone(), value.clone());
                    }
                    updated.push(row.clone());
                }
            }
            trace!(collection, rows = updated.len(), "memory update");
            Ok(updated)
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
            let mut collections = self.collections.write().await;
            let Some(rows) = collections.get_mut(collection) else {
                return Ok(0);
            };
            let before = rows.len();
            rows.retain(|r| !filters.iter().all(|f| f.matches(r)));
            Ok(before - rows.len())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn insert_assigns_ids() {
        let store = MemoryStore::new();
        let inserted = store
            .insert(
                "bookings",
                vec![row(json!({"client_id": "c1"})), row(json!({"id": "custom"}))],
            )
            .await
            .unwrap();

        let generated = inserted[0]["id"].as_str().unwrap();
        assert!(uuid::Uuid::parse_str(generated).is_ok());
        assert_eq!(inserted[1]["id"], "custom");
    }

    #[tokio::test]
    async fn select_filters_orders_and_limits() {
        let store = MemoryStore::new();
        store
            .insert(
                "availability_settings",
                vec![
                    row(json!({"provider_id": "p1", "day_of_week": 3, "start_time": "09:00"})),
                    row(json!({"provider_id": "p1", "day_of_week": 1, "start_time": "13:00"})),
                    row(json!({"provider_id": "p2", "day_of_week": 1, "start_time": "08:00"})),
                    row(json!({"provider_id": "p1", "day_of_week": 1, "start_time": "09:00"})),
                ],
            )
            .await
            .unwrap();

        let query = Query::new("availability_settings")
            .eq("provider_id", "p1")
            .order_by("day_of_week")
            .order_by("start_time");
        let rows = store.select(&query).await.unwrap();
        let starts: Vec<_> = rows.iter().map(|r| r["start_time"].as_str().unwrap()).collect();
        assert_eq!(starts, vec!["09:00", "13:00", "09:00"]);

        let first = store.select_single(&query).await.unwrap().unwrap();
        assert_eq!(first["day_of_week"], 1);
        assert_eq!(first["start_time"], "09:00");

        let none = store
            .select_single(&Query::new("availability_settings").eq("provider_id", "p9"))
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn unknown_collection_is_empty() {
        let store = MemoryStore::new();
        assert!(store.select(&Query::new("nope")).await.unwrap().is_empty());
        assert_eq!(store.delete("nope", &[Filter::eq("id", "1")]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn update_merges_patch() {
        let store = MemoryStore::new();
        store
            .insert(
                "bookings",
                vec![row(json!({"id": "a1", "provider_id": "p1", "status": "scheduled"}))],
            )
            .await
            .unwrap();

        let filters = [Filter::eq("id", "a1"), Filter::eq("provider_id", "p1")];
        let updated = store
            .update("bookings", &filters, row(json!({"status": "cancelled"})))
            .await
            .unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0]["status"], "cancelled");
        assert_eq!(updated[0]["provider_id"], "p1");

        let wrong_provider = [Filter::eq("id", "a1"), Filter::eq("provider_id", "p2")];
        let updated = store
            .update("bookings", &wrong_provider, row(json!({"status": "scheduled"})))
            .await
            .unwrap();
        assert!(updated.is_empty());
    }

    #[tokio::test]
    async fn unfiltered_writes_are_rejected() {
        let store = MemoryStore::new();
        assert!(store.update("bookings", &[], Row::new()).await.is_err());
        assert!(store.delete("bookings", &[]).await.is_err());
    }

    #[tokio::test]
    async fn delete_counts_rows() {
        let store = MemoryStore::new();
        store
            .insert(
                "availability_settings",
                vec![
                    row(json!({"provider_id": "p1"})),
                    row(json!({"provider_id": "p1"})),
                    row(json!({"provider_id": "p2"})),
                ],
            )
            .await
            .unwrap();

        let removed = store
            .delete("availability_settings", &[Filter::eq("provider_id", "p1")])
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(
            store
                .select(&Query::new("availability_settings"))
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = MemoryStore::new();
        store
            .insert("bookings", vec![row(json!({})), row(json!({}))])
            .await
            .unwrap();
        store.save(&path).await.unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let loaded = MemoryStore::load(&path).await.unwrap();
        assert_eq!(loaded.snapshot().await["bookings"].len(), 2);

        let before = store.snapshot().await;
        assert_eq!(loaded.snapshot().await, before);
    }

    #[tokio::test]
    async fn load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::load(&dir.path().join("absent.json"))
            .await
            .unwrap();
        assert!(store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            MemoryStore::load(&path).await,
            Err(StoreError::Serialization(_))
        ));
    }
}
