//! Active-topic lookup.

use std::collections::HashSet;
use std::sync::Arc;

use slotwatch_core::Topic;
use slotwatch_storage::{DocumentStore, Filter};

use crate::TOPICS_COLLECTION;

/// Derives the set of topics with at least one live subscriber from the
/// denormalized counters.
#[derive(Clone)]
pub struct TopicRegistry {
    store: Arc<dyn DocumentStore>,
}

impl TopicRegistry {
    /// Creates a registry over the given backend.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Returns every topic whose `active` counter is positive.
    ///
    /// The read is a snapshot taken before any of the tick's writes. A
    /// failed read yields the empty set (a broken read must never fabricate
    /// topics) and the tick simply does nothing; state resumes correctly on
    /// the next tick.
    pub async fn active_topics(&self) -> HashSet<Topic> {
        let docs = match self
            .store
            .find(TOPICS_COLLECTION, &[Filter::gt("active", 0)])
            .await
        {
            Ok(docs) => docs,
            Err(e) => {
                tracing::warn!(error = %e, "Active-topic read failed, treating as empty");
                return HashSet::new();
            }
        };

        docs.iter()
            .filter_map(|doc| match Topic::parse(&doc.id) {
                Ok(topic) => Some(topic),
                Err(e) => {
                    tracing::warn!(id = doc.id, error = %e, "Skipping malformed topic key");
                    None
                }
            })
            .collect()
    }
}
