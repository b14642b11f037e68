//! The tick driver.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::join_all;

use slotwatch_core::{DeliveryOutcome, Subscription};
use slotwatch_push::NotificationDispatcher;

use crate::error::EngineResult;
use crate::probe::{AvailabilityProber, open_topics};
use crate::reconciler::SubscriptionReconciler;
use crate::registry::TopicRegistry;
use crate::services::ServiceDirectory;
use crate::store::SubscriptionStore;

/// Composes the engine components into one complete, idempotent-effect poll
/// cycle.
///
/// The orchestrator assumes at most one tick in flight; overlapping
/// invocations are not mutually excluded here and could double-notify a
/// transition observed twice. Keeping invocations from overlapping is the
/// external scheduler's contract.
pub struct PollOrchestrator {
    registry: TopicRegistry,
    prober: Arc<dyn AvailabilityProber>,
    directory: Arc<ServiceDirectory>,
    subscriptions: SubscriptionStore,
    dispatcher: Arc<NotificationDispatcher>,
    reconciler: Arc<SubscriptionReconciler>,
    probe_concurrency: usize,
}

impl PollOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: TopicRegistry,
        prober: Arc<dyn AvailabilityProber>,
        directory: Arc<ServiceDirectory>,
        subscriptions: SubscriptionStore,
        dispatcher: Arc<NotificationDispatcher>,
        reconciler: Arc<SubscriptionReconciler>,
        probe_concurrency: usize,
    ) -> Self {
        Self {
            registry,
            prober,
            directory,
            subscriptions,
            dispatcher,
            reconciler,
            probe_concurrency,
        }
    }

    /// Runs one poll cycle.
    ///
    /// Most ticks stop after probing: no watched topic has open slots.
    /// Service groups are processed independently and concurrently; a
    /// failure in one group is logged and never blocks or rolls back
    /// another.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::StoreRead` when the grouped subscription fetch
    /// fails; the tick aborts without partial effects and the next tick
    /// re-derives everything.
    pub async fn run_tick(&self) -> EngineResult<()> {
        let topics = self.registry.active_topics().await;
        if topics.is_empty() {
            tracing::debug!("No active topics, nothing to poll");
            return Ok(());
        }

        let open = open_topics(self.prober.as_ref(), &topics, self.probe_concurrency).await;
        if open.is_empty() {
            tracing::debug!(candidates = topics.len(), "No topics with open slots");
            return Ok(());
        }
        tracing::info!(
            candidates = topics.len(),
            open = open.len(),
            "Topics with open slots"
        );

        let (services, grouped) = tokio::join!(
            self.directory.list_services(),
            self.subscriptions.subscriptions_for_topics(&open)
        );
        let grouped = grouped?;

        let names: HashMap<&str, &str> = services
            .iter()
            .map(|s| (s.id.as_str(), s.name.as_str()))
            .collect();

        let groups = grouped.into_iter().filter_map(|(service_id, subs)| {
            match names.get(service_id.as_str()) {
                Some(name) => Some(self.notify_group(service_id.clone(), (*name).to_string(), subs)),
                None => {
                    tracing::warn!(
                        service_id,
                        subscriptions = subs.len(),
                        "Service missing from directory, skipping group this tick"
                    );
                    None
                }
            }
        });
        join_all(groups).await;

        Ok(())
    }

    /// Dispatches and reconciles one service group. Errors stay inside the
    /// group.
    async fn notify_group(
        &self,
        service_id: String,
        service_name: String,
        subscriptions: Vec<Subscription>,
    ) {
        let tokens: Vec<String> = subscriptions.iter().map(|s| s.token.clone()).collect();

        let outcomes = match self.dispatcher.send(&service_name, &tokens).await {
            Ok(outcomes) => outcomes,
            Err(e) => {
                tracing::warn!(
                    service_id,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Push dispatch failed, skipping reconciliation for group"
                );
                return;
            }
        };

        let paired: Vec<(Subscription, DeliveryOutcome)> =
            subscriptions.into_iter().zip(outcomes).collect();

        if let Err(e) = self.reconciler.reconcile(&service_id, &paired).await {
            tracing::error!(service_id, error = %e, "Reconciliation failed for group");
        }
    }
}
