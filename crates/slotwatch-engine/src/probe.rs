//! Upstream availability probes.
//!
//! One probe is one GET against the booking site's calendar endpoint for a
//! (service, location) pair. Probes are fail-closed: any network error,
//! timeout, non-2xx status or undecodable body counts as "no slots", since
//! missing one tick's notification beats notifying on an error condition.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream;
use reqwest::Client;
use serde::Deserialize;

use slotwatch_core::Topic;

/// Template placeholders substituted per probe.
const SERVICE_PLACEHOLDER: &str = "{service}";
const LOCATION_PLACEHOLDER: &str = "{location}";

/// Asks the upstream source whether a topic currently has open slots.
#[async_trait]
pub trait AvailabilityProber: Send + Sync {
    /// `true` iff the topic has at least one open slot right now.
    /// Never errors; failures resolve to `false`.
    async fn probe(&self, topic: &Topic) -> bool;
}

/// HTTP prober against the booking site's calendar endpoint.
pub struct HttpProber {
    client: Client,
    url_template: String,
}

/// Calendar response of the booking site: open slot dates for the pair.
#[derive(Debug, Deserialize)]
struct CalendarResponse {
    #[serde(default)]
    dias: Vec<String>,
}

impl HttpProber {
    /// Creates a prober. `url_template` must carry `{service}` and
    /// `{location}` placeholders; `timeout` applies independently to each
    /// probe.
    pub fn new(url_template: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            url_template: url_template.into(),
        }
    }

    fn probe_url(&self, topic: &Topic) -> String {
        self.url_template
            .replace(SERVICE_PLACEHOLDER, topic.service_id())
            .replace(LOCATION_PLACEHOLDER, topic.location_id())
    }

    /// The open slot dates for a topic; empty on any failure.
    pub async fn slot_dates(&self, topic: &Topic) -> Vec<String> {
        let url = self.probe_url(topic);
        let response = match self.client.get(&url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(topic = %topic, error = %e, "Probe request failed");
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            tracing::debug!(
                topic = %topic,
                status = response.status().as_u16(),
                "Probe returned non-success status"
            );
            return Vec::new();
        }

        match response.json::<CalendarResponse>().await {
            Ok(calendar) => calendar.dias,
            Err(e) => {
                tracing::warn!(topic = %topic, error = %e, "Probe response undecodable");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl AvailabilityProber for HttpProber {
    async fn probe(&self, topic: &Topic) -> bool {
        !self.slot_dates(topic).await.is_empty()
    }
}

/// Probes every candidate topic with bounded concurrency and returns the
/// subset with open slots.
///
/// Each probe writes its own `(topic, open)` slot; the open set is reduced
/// from the collected results only after every probe has settled, so
/// concurrently completing probes never touch shared state.
pub async fn open_topics(
    prober: &dyn AvailabilityProber,
    topics: &HashSet<Topic>,
    concurrency: usize,
) -> HashSet<Topic> {
    let concurrency = concurrency.max(1);
    let results: Vec<(Topic, bool)> = stream::iter(topics.iter().cloned())
        .map(|topic| async move {
            let open = prober.probe(&topic).await;
            (topic, open)
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    results
        .into_iter()
        .filter(|(_, open)| *open)
        .map(|(topic, _)| topic)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProber {
        open: HashSet<Topic>,
    }

    #[async_trait]
    impl AvailabilityProber for FixedProber {
        async fn probe(&self, topic: &Topic) -> bool {
            self.open.contains(topic)
        }
    }

    fn topic(raw: &str) -> Topic {
        Topic::parse(raw).unwrap()
    }

    #[test]
    fn test_probe_url_substitution() {
        let prober = HttpProber::new(
            "http://upstream.example/centro/{location}/servicio/{service}/calendario",
            Duration::from_secs(1),
        );
        assert_eq!(
            prober.probe_url(&topic("5_12")),
            "http://upstream.example/centro/12/servicio/5/calendario"
        );
    }

    #[tokio::test]
    async fn test_open_topics_reduces_collected_results() {
        let candidates: HashSet<Topic> =
            ["5_12", "5_13", "6_1", "7_2"].iter().map(|t| topic(t)).collect();
        let prober = FixedProber {
            open: ["5_13", "7_2"].iter().map(|t| topic(t)).collect(),
        };

        let open = open_topics(&prober, &candidates, 2).await;
        assert_eq!(open, prober.open);
    }

    #[tokio::test]
    async fn test_open_topics_tolerates_zero_concurrency() {
        let candidates: HashSet<Topic> = [topic("5_12")].into_iter().collect();
        let prober = FixedProber {
            open: candidates.clone(),
        };
        assert_eq!(open_topics(&prober, &candidates, 0).await, candidates);
    }
}
