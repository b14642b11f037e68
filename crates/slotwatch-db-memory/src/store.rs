use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use slotwatch_storage::{Document, DocumentStore, Filter, StorageError, WriteBatch, WriteOp};

/// The `in`-query element limit of the document database this backend
/// stands in for; kept identical so chunking code paths are exercised.
const MAX_IN_VALUES: usize = 10;

type Collection = BTreeMap<String, Document>;

/// In-memory document store.
///
/// All state lives behind one `RwLock`, which makes batch commits trivially
/// all-or-nothing: the batch is applied to a copy of the state under the
/// write guard and swapped in only if every operation succeeded.
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
    max_in_values: usize,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            max_in_values: MAX_IN_VALUES,
        }
    }

    /// Overrides the `In`-filter element limit (tests exercise chunking with
    /// small limits).
    pub fn with_max_in_values(mut self, max_in_values: usize) -> Self {
        self.max_in_values = max_in_values;
        self
    }

    fn apply(
        state: &mut HashMap<String, Collection>,
        op: &WriteOp,
    ) -> Result<(), StorageError> {
        match op {
            WriteOp::Set {
                collection,
                id,
                fields,
                merge,
            } => {
                let coll = state.entry(collection.clone()).or_default();
                match coll.get_mut(id) {
                    Some(existing) if *merge => merge_fields(&mut existing.fields, fields),
                    Some(existing) => existing.fields = fields.clone(),
                    None => {
                        coll.insert(
                            id.clone(),
                            Document::new(collection.clone(), id.clone(), fields.clone()),
                        );
                    }
                }
                Ok(())
            }
            WriteOp::Update {
                collection,
                id,
                fields,
            } => {
                let existing = state
                    .get_mut(collection)
                    .and_then(|coll| coll.get_mut(id))
                    .ok_or_else(|| StorageError::not_found(collection, id))?;
                merge_fields(&mut existing.fields, fields);
                Ok(())
            }
            WriteOp::Delete { collection, id } => {
                let removed = state
                    .get_mut(collection)
                    .and_then(|coll| coll.remove(id));
                match removed {
                    Some(_) => Ok(()),
                    None => Err(StorageError::not_found(collection, id)),
                }
            }
            WriteOp::Increment {
                collection,
                id,
                field,
                delta,
            } => {
                let coll = state.entry(collection.clone()).or_default();
                match coll.get_mut(id) {
                    Some(existing) => {
                        let current = existing
                            .fields
                            .get(field)
                            .and_then(Value::as_i64)
                            .unwrap_or(0);
                        merge_fields(&mut existing.fields, &single_field(field, current + delta));
                        Ok(())
                    }
                    None => {
                        coll.insert(
                            id.clone(),
                            Document::new(collection.clone(), id.clone(), single_field(field, *delta)),
                        );
                        Ok(())
                    }
                }
            }
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn single_field(field: &str, value: i64) -> Value {
    let mut fields = serde_json::Map::new();
    fields.insert(field.to_string(), Value::from(value));
    Value::Object(fields)
}

/// Shallow field-level merge, the document-database `set(…, merge)` shape.
fn merge_fields(target: &mut Value, incoming: &Value) {
    match (target.as_object_mut(), incoming.as_object()) {
        (Some(target), Some(incoming)) => {
            for (key, value) in incoming {
                target.insert(key.clone(), value.clone());
            }
        }
        _ => *target = incoming.clone(),
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StorageError> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(collection)
            .and_then(|coll| coll.get(id))
            .cloned())
    }

    async fn find(
        &self,
        collection: &str,
        filters: &[Filter],
    ) -> Result<Vec<Document>, StorageError> {
        for filter in filters {
            if let Filter::In { values, .. } = filter {
                if values.len() > self.max_in_values {
                    return Err(StorageError::invalid_document(format!(
                        "In filter carries {} values, limit is {}",
                        values.len(),
                        self.max_in_values
                    )));
                }
            }
        }

        let guard = self.collections.read().await;
        let Some(coll) = guard.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(coll
            .values()
            .filter(|doc| filters.iter().all(|f| f.matches(doc)))
            .cloned()
            .collect())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StorageError> {
        let mut guard = self.collections.write().await;
        let mut staged = guard.clone();
        for op in batch.ops() {
            Self::apply(&mut staged, op)?;
        }
        *guard = staged;
        Ok(())
    }

    fn max_in_values(&self) -> usize {
        self.max_in_values
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_and_get() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.set("subscriptions", "a", json!({"token": "t1"}));
        store.commit(batch).await.unwrap();

        let doc = store.get("subscriptions", "a").await.unwrap().unwrap();
        assert_eq!(doc.str_field("token"), Some("t1"));
        assert!(store.get("subscriptions", "b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_merge_keeps_existing_fields() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.set("topics", "5_12", json!({"active": 2}));
        batch.set_merge("topics", "5_12", json!({"delivered": 7}));
        store.commit(batch).await.unwrap();

        let doc = store.get("topics", "5_12").await.unwrap().unwrap();
        assert_eq!(doc.i64_field("active"), Some(2));
        assert_eq!(doc.i64_field("delivered"), Some(7));
    }

    #[tokio::test]
    async fn test_increment_upserts_and_accumulates() {
        let store = MemoryStore::new();

        let mut batch = WriteBatch::new();
        batch.increment("topics", "5_12", "active", 1);
        store.commit(batch).await.unwrap();

        let mut batch = WriteBatch::new();
        batch.increment("topics", "5_12", "active", 1);
        batch.increment("topics", "5_12", "active", -1);
        store.commit(batch).await.unwrap();

        let doc = store.get("topics", "5_12").await.unwrap().unwrap();
        assert_eq!(doc.i64_field("active"), Some(1));
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_state_untouched() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.set("topics", "5_12", json!({"active": 1}));
        store.commit(batch).await.unwrap();

        // Second op addresses a missing document; the first must not apply.
        let mut batch = WriteBatch::new();
        batch.increment("topics", "5_12", "active", 5);
        batch.delete("subscriptions", "missing");
        let err = store.commit(batch).await.unwrap_err();
        assert!(err.is_not_found());

        let doc = store.get("topics", "5_12").await.unwrap().unwrap();
        assert_eq!(doc.i64_field("active"), Some(1));
    }

    #[tokio::test]
    async fn test_delete_then_update_in_same_batch_fails() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.set("subscriptions", "a", json!({"token": "t"}));
        store.commit(batch).await.unwrap();

        let mut batch = WriteBatch::new();
        batch.delete("subscriptions", "a");
        batch.update("subscriptions", "a", json!({"token": "u"}));
        assert!(store.commit(batch).await.is_err());

        // Atomicity: the delete was rolled back with the rest.
        assert!(store.get("subscriptions", "a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_find_applies_all_filters() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.set("subscriptions", "a", json!({"token": "t1", "topic": "5_12"}));
        batch.set("subscriptions", "b", json!({"token": "t1", "topic": "5_13"}));
        batch.set("subscriptions", "c", json!({"token": "t2", "topic": "5_12"}));
        store.commit(batch).await.unwrap();

        let docs = store
            .find(
                "subscriptions",
                &[Filter::eq("token", "t1"), Filter::eq("topic", "5_12")],
            )
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "a");
    }

    #[tokio::test]
    async fn test_find_rejects_oversized_in_filter() {
        let store = MemoryStore::new().with_max_in_values(2);
        let filter = Filter::in_values(
            "topic",
            vec![json!("a"), json!("b"), json!("c")],
        );
        assert!(store.find("subscriptions", &[filter]).await.is_err());
    }

    #[tokio::test]
    async fn test_created_at_survives_merge() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.set("subscriptions", "a", json!({"token": "t"}));
        store.commit(batch).await.unwrap();
        let created = store
            .get("subscriptions", "a")
            .await
            .unwrap()
            .unwrap()
            .created_at;

        let mut batch = WriteBatch::new();
        batch.set_merge("subscriptions", "a", json!({"token": "u"}));
        store.commit(batch).await.unwrap();

        let doc = store.get("subscriptions", "a").await.unwrap().unwrap();
        assert_eq!(doc.created_at, created);
        assert_eq!(doc.str_field("token"), Some("u"));
    }
}
