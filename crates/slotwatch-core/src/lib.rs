//! Core domain types for the slotwatch appointment watcher.
//!
//! A *topic* is one watchable (service, location) pair on the municipal
//! booking site. Devices subscribe to topics; the engine probes the booking
//! site and notifies subscribers when a topic gains open appointment slots.

pub mod error;
pub mod id;
pub mod types;

pub use error::CoreError;
pub use id::generate_id;
pub use types::{DeliveryOutcome, Service, Subscription, Topic, TopicCounters};

/// Convenience result alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
