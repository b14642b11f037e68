//! Post-dispatch subscription reconciliation.
//!
//! A subscription is a one-shot watch: one successful delivery retires it.
//! Tokens the provider reports as permanently unreachable are pruned, as are
//! watches older than the maximum age regardless of delivery history.
//! Everything else is kept for a retry on a future tick.

use std::sync::Arc;

use time::{Duration, OffsetDateTime};

use slotwatch_core::{DeliveryOutcome, Subscription};
use slotwatch_storage::{DocumentStore, WriteBatch};

use crate::error::{EngineError, EngineResult};
use crate::{SUBSCRIPTIONS_COLLECTION, TOPICS_COLLECTION};

/// Applies the removal policy and commits one atomic batch per service
/// group.
pub struct SubscriptionReconciler {
    store: Arc<dyn DocumentStore>,
    max_age: Duration,
}

impl SubscriptionReconciler {
    /// Creates a reconciler pruning watches older than `max_age`.
    pub fn new(store: Arc<dyn DocumentStore>, max_age: Duration) -> Self {
        Self { store, max_age }
    }

    /// Whether a subscription should be removed given its delivery outcome.
    fn should_remove(
        &self,
        subscription: &Subscription,
        outcome: DeliveryOutcome,
        now: OffsetDateTime,
    ) -> bool {
        outcome.is_delivered()
            || outcome.is_permanent_failure()
            || now - subscription.created_at > self.max_age
    }

    /// Reconciles one service group after a successful dispatch.
    ///
    /// Deletions, `active` decrements and `delivered` increments for the
    /// group are committed as one all-or-nothing batch. If the commit
    /// fails, the group's subscription rows are untouched and the whole
    /// decision is re-derivable on the next tick.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Commit` when the batch is rejected.
    pub async fn reconcile(
        &self,
        service_id: &str,
        outcomes: &[(Subscription, DeliveryOutcome)],
    ) -> EngineResult<()> {
        let now = OffsetDateTime::now_utc();
        let mut batch = WriteBatch::new();
        let mut removed = 0usize;

        for (subscription, outcome) in outcomes {
            if !self.should_remove(subscription, *outcome, now) {
                continue;
            }

            batch.delete(SUBSCRIPTIONS_COLLECTION, &subscription.id);
            batch.increment(TOPICS_COLLECTION, subscription.topic.as_str(), "active", -1);
            if outcome.is_delivered() {
                batch.increment(
                    TOPICS_COLLECTION,
                    subscription.topic.as_str(),
                    "delivered",
                    1,
                );
            }
            removed += 1;
        }

        if batch.is_empty() {
            return Ok(());
        }

        self.store.commit(batch).await.map_err(EngineError::commit)?;
        tracing::info!(
            service_id,
            removed,
            kept = outcomes.len() - removed,
            "Reconciled service group"
        );
        Ok(())
    }
}
