//! Availability-polling and notification-dispatch engine.
//!
//! On each tick the [`PollOrchestrator`] snapshots the topics with live
//! subscribers, probes the booking site for each with bounded concurrency,
//! fans a push notification out to every device watching a topic that gained
//! open slots, and reconciles the subscription store per service group. Every
//! effect is safe to re-run: a lost tick is simply retried by the next one.

pub mod error;
pub mod orchestrator;
pub mod probe;
pub mod reconciler;
pub mod registry;
pub mod services;
pub mod store;

pub use error::{EngineError, EngineResult};
pub use orchestrator::PollOrchestrator;
pub use probe::{AvailabilityProber, HttpProber, open_topics};
pub use reconciler::SubscriptionReconciler;
pub use registry::TopicRegistry;
pub use services::{LocationAvailability, ServiceDirectory};
pub use store::SubscriptionStore;

/// Collection holding one document per live subscription.
pub const SUBSCRIPTIONS_COLLECTION: &str = "subscriptions";

/// Collection holding one counters document per topic, keyed by the topic.
pub const TOPICS_COLLECTION: &str = "topics";
