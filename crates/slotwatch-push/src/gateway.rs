//! Push provider gateway.
//!
//! [`FcmGateway`] speaks the legacy multicast endpoint: one POST per
//! service, one ordered `results` entry per token in the response.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use serde::Deserialize;

use slotwatch_core::DeliveryOutcome;

use crate::error::PushError;
use crate::message::MulticastMessage;

/// Provider error codes that permanently invalidate a token.
const ERR_INVALID_REGISTRATION: &str = "InvalidRegistration";
const ERR_MISSING_REGISTRATION: &str = "MissingRegistration";
const ERR_NOT_REGISTERED: &str = "NotRegistered";

/// A push provider able to deliver one multicast message.
#[async_trait]
pub trait PushGateway: Send + Sync {
    /// Sends one multicast message.
    ///
    /// On success the returned outcomes zip 1:1 with
    /// `message.registration_ids`, in order.
    ///
    /// # Errors
    ///
    /// Returns `PushError` when the provider call itself fails
    /// (network/auth/unusable response); no outcomes are fabricated in that
    /// case and the caller must not reconcile the batch.
    async fn send_multicast(
        &self,
        message: &MulticastMessage,
    ) -> Result<Vec<DeliveryOutcome>, PushError>;
}

/// HTTP gateway for the FCM legacy multicast endpoint.
pub struct FcmGateway {
    client: Client,
    endpoint: String,
    server_key: String,
}

impl FcmGateway {
    /// Creates a gateway against the given endpoint.
    pub fn new(endpoint: impl Into<String>, server_key: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            endpoint: endpoint.into(),
            server_key: server_key.into(),
        }
    }

}

#[derive(Debug, Deserialize)]
struct MulticastResponse {
    results: Vec<SendResultEntry>,
}

#[derive(Debug, Deserialize)]
struct SendResultEntry {
    /// Provider error code; absent on successful delivery.
    #[serde(default)]
    error: Option<String>,
}

/// Maps one provider result entry onto a delivery outcome.
fn classify(entry: &SendResultEntry) -> DeliveryOutcome {
    match entry.error.as_deref() {
        None => DeliveryOutcome::Delivered,
        Some(ERR_INVALID_REGISTRATION) | Some(ERR_MISSING_REGISTRATION) => {
            DeliveryOutcome::InvalidToken
        }
        Some(ERR_NOT_REGISTERED) => DeliveryOutcome::NotRegistered,
        Some(_) => DeliveryOutcome::Other,
    }
}

#[async_trait]
impl PushGateway for FcmGateway {
    async fn send_multicast(
        &self,
        message: &MulticastMessage,
    ) -> Result<Vec<DeliveryOutcome>, PushError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(header::AUTHORIZATION, format!("key={}", self.server_key))
            .json(message)
            .send()
            .await
            .map_err(|e| PushError::network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(PushError::auth(format!("HTTP {}", status.as_u16())));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PushError::network(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let parsed: MulticastResponse = response
            .json()
            .await
            .map_err(|e| PushError::invalid_response(e.to_string()))?;

        if parsed.results.len() != message.token_count() {
            return Err(PushError::invalid_response(format!(
                "{} results for {} tokens",
                parsed.results.len(),
                message.token_count()
            )));
        }

        let outcomes: Vec<DeliveryOutcome> = parsed.results.iter().map(classify).collect();
        tracing::debug!(
            tokens = message.token_count(),
            delivered = outcomes.iter().filter(|o| o.is_delivered()).count(),
            "Multicast send completed"
        );
        Ok(outcomes)
    }
}
