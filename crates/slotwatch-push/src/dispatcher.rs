//! Per-service notification dispatch.

use std::sync::Arc;

use slotwatch_core::DeliveryOutcome;

use crate::error::PushError;
use crate::gateway::PushGateway;
use crate::message::{MulticastMessage, PushLinks};

/// Sends one multicast notification per service and hands back ordered
/// per-token outcomes.
pub struct NotificationDispatcher {
    gateway: Arc<dyn PushGateway>,
    links: PushLinks,
}

impl NotificationDispatcher {
    /// Creates a dispatcher over the given gateway.
    pub fn new(gateway: Arc<dyn PushGateway>, links: PushLinks) -> Self {
        Self { gateway, links }
    }

    /// Notifies every token that the named service has open slots.
    ///
    /// The returned outcomes zip 1:1 with `tokens`, in order, so the caller
    /// can pair them back to subscriptions.
    ///
    /// # Errors
    ///
    /// Returns `PushError` when the provider call itself fails; the caller
    /// must skip reconciliation for the whole batch in that case.
    pub async fn send(
        &self,
        service_name: &str,
        tokens: &[String],
    ) -> Result<Vec<DeliveryOutcome>, PushError> {
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let message = MulticastMessage::for_service(service_name, tokens.to_vec(), &self.links);
        let outcomes = self.gateway.send_multicast(&message).await?;

        tracing::info!(
            service = service_name,
            tokens = tokens.len(),
            delivered = outcomes.iter().filter(|o| o.is_delivered()).count(),
            "Dispatched availability notification"
        );
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct RecordingGateway;

    #[async_trait]
    impl PushGateway for RecordingGateway {
        async fn send_multicast(
            &self,
            message: &MulticastMessage,
        ) -> Result<Vec<DeliveryOutcome>, PushError> {
            Ok(vec![DeliveryOutcome::Delivered; message.token_count()])
        }
    }

    fn dispatcher() -> NotificationDispatcher {
        NotificationDispatcher::new(
            Arc::new(RecordingGateway),
            PushLinks {
                icon_url: "https://portal.example/logo.png".into(),
                portal_url: "https://portal.example/booking".into(),
            },
        )
    }

    #[tokio::test]
    async fn test_outcomes_match_token_order() {
        let outcomes = dispatcher()
            .send("Census office", &["t1".into(), "t2".into(), "t3".into()])
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_token_list_skips_provider() {
        let outcomes = dispatcher().send("Census office", &[]).await.unwrap();
        assert!(outcomes.is_empty());
    }
}
