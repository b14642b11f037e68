//! Storage traits for the document-store abstraction layer.
//!
//! This module defines the contract that all storage backends must implement.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::types::{Document, Filter, WriteBatch};

/// The storage trait that all document-store backends must implement.
///
/// Reads are filtered by ANDed field predicates; writes go through
/// all-or-nothing batches. Implementations must be thread-safe
/// (`Send + Sync`).
///
/// # Example
///
/// ```ignore
/// use slotwatch_storage::{DocumentStore, Filter, StorageError};
///
/// async fn live_topics(store: &dyn DocumentStore) -> Result<usize, StorageError> {
///     Ok(store.find("topics", &[Filter::gt("active", 0)]).await?.len())
/// }
/// ```
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads a document by collection and id.
    ///
    /// Returns `None` if the document does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues, not for missing
    /// documents.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StorageError>;

    /// Returns every document in `collection` matching all `filters`.
    ///
    /// An `In` filter must not carry more than [`max_in_values`] values;
    /// callers chunk larger sets.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidDocument` for an oversized `In` filter.
    /// Returns an error for infrastructure issues.
    ///
    /// [`max_in_values`]: DocumentStore::max_in_values
    async fn find(
        &self,
        collection: &str,
        filters: &[Filter],
    ) -> Result<Vec<Document>, StorageError>;

    /// Applies a write batch atomically: either every operation commits or
    /// none does.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if an `Update` or `Delete` addresses
    /// a missing document; the whole batch is rejected.
    /// Returns `StorageError::BatchError` for other batch-level failures.
    async fn commit(&self, batch: WriteBatch) -> Result<(), StorageError>;

    /// Maximum number of values a single `In` filter may carry.
    fn max_in_values(&self) -> usize;

    /// Returns the name of this storage backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}
