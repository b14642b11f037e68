//! Subscription store over the document-store collaborator.
//!
//! Owns the `subscriptions` and `topics` collections. Every mutation pairs
//! the subscription write with the matching `active` counter change in one
//! atomic batch, so the denormalized counter can only lag by a lost batch,
//! never half-apply.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::json;

use slotwatch_core::{Subscription, Topic, TopicCounters, generate_id};
use slotwatch_storage::{Document, DocumentStore, Filter, WriteBatch};

use crate::error::{EngineError, EngineResult};
use crate::{SUBSCRIPTIONS_COLLECTION, TOPICS_COLLECTION};

/// CRUD and filtered queries over subscription records and per-topic
/// counters.
#[derive(Clone)]
pub struct SubscriptionStore {
    store: Arc<dyn DocumentStore>,
}

impl SubscriptionStore {
    /// Creates a store over the given backend.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Subscribes a device token to a topic and returns the subscription id.
    ///
    /// Idempotent per (token, topic): an existing live subscription is
    /// returned as-is instead of creating a duplicate. Otherwise the new
    /// record and the topic's `active` increment commit together.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidArgument` for an empty token.
    pub async fn subscribe(&self, token: &str, topic: &Topic) -> EngineResult<String> {
        if token.is_empty() {
            return Err(EngineError::invalid_argument("token must not be empty"));
        }

        let existing = self
            .store
            .find(
                SUBSCRIPTIONS_COLLECTION,
                &[
                    Filter::eq("token", token),
                    Filter::eq("topic", topic.as_str()),
                ],
            )
            .await
            .map_err(EngineError::store_read)?;
        if let Some(doc) = existing.first() {
            tracing::debug!(topic = %topic, id = doc.id, "Subscription already exists");
            return Ok(doc.id.clone());
        }

        let id = generate_id();
        let mut batch = WriteBatch::new();
        batch.set(
            SUBSCRIPTIONS_COLLECTION,
            id.clone(),
            json!({"token": token, "topic": topic.as_str()}),
        );
        batch.increment(TOPICS_COLLECTION, topic.as_str(), "active", 1);
        self.store.commit(batch).await.map_err(EngineError::commit)?;

        tracing::info!(topic = %topic, id, "Subscription created");
        Ok(id)
    }

    /// Removes a subscription and decrements the topic's `active` counter in
    /// one batch.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidArgument` for an empty id and
    /// `EngineError::SubscriptionNotFound` for an unknown one.
    pub async fn unsubscribe(&self, topic: &Topic, subscription_id: &str) -> EngineResult<()> {
        if subscription_id.is_empty() {
            return Err(EngineError::invalid_argument(
                "subscription id must not be empty",
            ));
        }

        let existing = self
            .store
            .get(SUBSCRIPTIONS_COLLECTION, subscription_id)
            .await
            .map_err(EngineError::store_read)?;
        if existing.is_none() {
            return Err(EngineError::subscription_not_found(subscription_id));
        }

        let mut batch = WriteBatch::new();
        batch.delete(SUBSCRIPTIONS_COLLECTION, subscription_id);
        batch.increment(TOPICS_COLLECTION, topic.as_str(), "active", -1);
        self.store.commit(batch).await.map_err(EngineError::commit)?;

        tracing::info!(topic = %topic, id = subscription_id, "Subscription removed");
        Ok(())
    }

    /// Returns every subscription watching one of `topics`, grouped by
    /// service id.
    ///
    /// The backend bounds how many topics one set-membership query may
    /// carry, so the set is chunked to that limit and the results merged;
    /// no topic is ever silently dropped.
    pub async fn subscriptions_for_topics(
        &self,
        topics: &HashSet<Topic>,
    ) -> EngineResult<HashMap<String, Vec<Subscription>>> {
        let mut grouped: HashMap<String, Vec<Subscription>> = HashMap::new();
        if topics.is_empty() {
            return Ok(grouped);
        }

        let mut keys: Vec<&Topic> = topics.iter().collect();
        keys.sort();

        let chunk_size = self.store.max_in_values().max(1);
        for chunk in keys.chunks(chunk_size) {
            let values = chunk.iter().map(|t| json!(t.as_str())).collect();
            let docs = self
                .store
                .find(
                    SUBSCRIPTIONS_COLLECTION,
                    &[Filter::in_values("topic", values)],
                )
                .await
                .map_err(EngineError::store_read)?;

            for doc in &docs {
                match parse_subscription(doc) {
                    Ok(sub) => grouped
                        .entry(sub.topic.service_id().to_string())
                        .or_default()
                        .push(sub),
                    Err(e) => {
                        tracing::warn!(id = doc.id, error = %e, "Skipping malformed subscription");
                    }
                }
            }
        }

        Ok(grouped)
    }

    /// Returns the device's current watches as a topic → subscription id
    /// mapping. Unknown tokens yield an empty mapping, not an error.
    pub async fn subscriptions_for_token(
        &self,
        token: &str,
    ) -> EngineResult<HashMap<Topic, String>> {
        if token.is_empty() {
            return Err(EngineError::invalid_argument("token must not be empty"));
        }

        let docs = self
            .store
            .find(SUBSCRIPTIONS_COLLECTION, &[Filter::eq("token", token)])
            .await
            .map_err(EngineError::store_read)?;

        let mut mapping = HashMap::new();
        for doc in &docs {
            match parse_subscription(doc) {
                Ok(sub) => {
                    mapping.insert(sub.topic, sub.id);
                }
                Err(e) => {
                    tracing::warn!(id = doc.id, error = %e, "Skipping malformed subscription");
                }
            }
        }
        Ok(mapping)
    }

    /// Reads a topic's denormalized counters, `None` if the topic has never
    /// been written.
    pub async fn topic_counters(&self, topic: &Topic) -> EngineResult<Option<TopicCounters>> {
        let doc = self
            .store
            .get(TOPICS_COLLECTION, topic.as_str())
            .await
            .map_err(EngineError::store_read)?;
        Ok(doc.map(|d| TopicCounters {
            active: d.i64_field("active").unwrap_or(0),
            delivered: d.i64_field("delivered").unwrap_or(0),
        }))
    }
}

/// Reads a subscription record out of its document.
pub(crate) fn parse_subscription(doc: &Document) -> Result<Subscription, slotwatch_core::CoreError> {
    let token = doc
        .str_field("token")
        .ok_or_else(|| slotwatch_core::CoreError::invalid_argument("missing token field"))?
        .to_string();
    let topic = Topic::parse(doc.str_field("topic").unwrap_or_default())?;
    Ok(Subscription {
        id: doc.id.clone(),
        token,
        topic,
        created_at: doc.created_at,
    })
}
