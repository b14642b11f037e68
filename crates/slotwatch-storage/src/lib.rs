//! Document-store abstraction for slotwatch.
//!
//! Models the contract of the document database the watcher runs against:
//! reads filtered by field predicates (including bounded set-membership
//! queries) and all-or-nothing write batches combining set, update, delete
//! and increment operations. Backends implement [`DocumentStore`].

pub mod error;
pub mod traits;
pub mod types;

pub use error::{ErrorCategory, StorageError};
pub use traits::DocumentStore;
pub use types::{Document, Filter, WriteBatch, WriteOp};
