//! Storage types for the document-store abstraction layer.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

/// A document as stored in the storage backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// The document id, unique within its collection.
    pub id: String,
    /// The collection the document belongs to.
    pub collection: String,
    /// The document fields as a JSON object.
    pub fields: Value,
    /// When the document was originally created (store-assigned).
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Document {
    /// Creates a new `Document` stamped with the current time.
    #[must_use]
    pub fn new(collection: impl Into<String>, id: impl Into<String>, fields: Value) -> Self {
        Self {
            id: id.into(),
            collection: collection.into(),
            fields,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Returns a field by name, if present.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Returns a string field by name, if present and a string.
    #[must_use]
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }

    /// Returns an integer field by name, if present and an integer.
    #[must_use]
    pub fn i64_field(&self, name: &str) -> Option<i64> {
        self.field(name).and_then(Value::as_i64)
    }
}

/// A field predicate for a filtered read. Multiple filters are ANDed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    /// Field equals value.
    Eq { field: String, value: Value },
    /// Field is numerically greater than value.
    Gt { field: String, value: Value },
    /// Field is one of the given values. Backends bound the number of
    /// values per query; see `DocumentStore::max_in_values`.
    In { field: String, values: Vec<Value> },
}

impl Filter {
    /// Creates an equality filter.
    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates a greater-than filter.
    #[must_use]
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Gt {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates a set-membership filter.
    #[must_use]
    pub fn in_values(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::In {
            field: field.into(),
            values,
        }
    }

    /// Whether the given document satisfies this predicate.
    #[must_use]
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Self::Eq { field, value } => doc.field(field) == Some(value),
            Self::Gt { field, value } => match (
                doc.field(field).and_then(Value::as_f64),
                value.as_f64(),
            ) {
                (Some(actual), Some(bound)) => actual > bound,
                _ => false,
            },
            Self::In { field, values } => doc
                .field(field)
                .is_some_and(|actual| values.contains(actual)),
        }
    }
}

/// An ordered set of write operations applied all-or-nothing.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    /// Creates a new empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a full overwrite of the document's fields, creating the
    /// document if it does not exist.
    pub fn set(&mut self, collection: impl Into<String>, id: impl Into<String>, fields: Value) {
        self.ops.push(WriteOp::Set {
            collection: collection.into(),
            id: id.into(),
            fields,
            merge: false,
        });
    }

    /// Queues a field-level merge into the document, creating it if it does
    /// not exist.
    pub fn set_merge(
        &mut self,
        collection: impl Into<String>,
        id: impl Into<String>,
        fields: Value,
    ) {
        self.ops.push(WriteOp::Set {
            collection: collection.into(),
            id: id.into(),
            fields,
            merge: true,
        });
    }

    /// Queues a field-level update of an existing document. Fails the batch
    /// if the document does not exist.
    pub fn update(&mut self, collection: impl Into<String>, id: impl Into<String>, fields: Value) {
        self.ops.push(WriteOp::Update {
            collection: collection.into(),
            id: id.into(),
            fields,
        });
    }

    /// Queues deletion of an existing document. Fails the batch if the
    /// document does not exist.
    pub fn delete(&mut self, collection: impl Into<String>, id: impl Into<String>) {
        self.ops.push(WriteOp::Delete {
            collection: collection.into(),
            id: id.into(),
        });
    }

    /// Queues an atomic numeric increment, creating the document with the
    /// field at `delta` if it does not exist.
    pub fn increment(
        &mut self,
        collection: impl Into<String>,
        id: impl Into<String>,
        field: impl Into<String>,
        delta: i64,
    ) {
        self.ops.push(WriteOp::Increment {
            collection: collection.into(),
            id: id.into(),
            field: field.into(),
            delta,
        });
    }

    /// The queued operations, in order.
    #[must_use]
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    /// Number of queued operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns true if no operations are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// A single operation within a [`WriteBatch`].
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Write the document's fields, optionally merging with existing ones.
    Set {
        collection: String,
        id: String,
        fields: Value,
        merge: bool,
    },
    /// Merge fields into an existing document.
    Update {
        collection: String,
        id: String,
        fields: Value,
    },
    /// Delete an existing document.
    Delete { collection: String, id: String },
    /// Atomically add `delta` to a numeric field, upserting the document.
    Increment {
        collection: String,
        id: String,
        field: String,
        delta: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(fields: Value) -> Document {
        Document::new("topics", "5_12", fields)
    }

    #[test]
    fn test_eq_filter() {
        let d = doc(json!({"token": "abc"}));
        assert!(Filter::eq("token", "abc").matches(&d));
        assert!(!Filter::eq("token", "xyz").matches(&d));
        assert!(!Filter::eq("missing", "abc").matches(&d));
    }

    #[test]
    fn test_gt_filter_is_numeric() {
        let d = doc(json!({"active": 3}));
        assert!(Filter::gt("active", 0).matches(&d));
        assert!(!Filter::gt("active", 3).matches(&d));

        // Non-numeric fields never match a numeric bound.
        let d = doc(json!({"active": "three"}));
        assert!(!Filter::gt("active", 0).matches(&d));
    }

    #[test]
    fn test_in_filter() {
        let d = doc(json!({"topic": "5_12"}));
        let f = Filter::in_values("topic", vec![json!("5_12"), json!("5_13")]);
        assert!(f.matches(&d));
        let f = Filter::in_values("topic", vec![json!("6_1")]);
        assert!(!f.matches(&d));
    }

    #[test]
    fn test_batch_builder_preserves_order() {
        let mut batch = WriteBatch::new();
        batch.set("subscriptions", "a", json!({"token": "t"}));
        batch.increment("topics", "5_12", "active", 1);
        batch.delete("subscriptions", "b");

        assert_eq!(batch.len(), 3);
        assert!(matches!(batch.ops()[0], WriteOp::Set { .. }));
        assert!(matches!(
            batch.ops()[1],
            WriteOp::Increment { delta: 1, .. }
        ));
        assert!(matches!(batch.ops()[2], WriteOp::Delete { .. }));
    }
}
