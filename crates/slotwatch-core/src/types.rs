use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::CoreError;

/// Separator between the service and location halves of a topic key.
const TOPIC_SEPARATOR: char = '_';

/// A watchable (service, location) pair on the booking site.
///
/// The canonical form is `"<service_id>_<location_id>"` and is used both as
/// the push channel key and as the storage document key for the topic's
/// counters. Topics are immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    /// Creates a topic from its service and location ids.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidTopic` if either half is empty or the
    /// service id contains the separator (the location half may, since the
    /// split is always on the first separator).
    pub fn new(service_id: &str, location_id: &str) -> Result<Self, CoreError> {
        if service_id.is_empty() || location_id.is_empty() {
            return Err(CoreError::invalid_topic(format!(
                "{service_id}{TOPIC_SEPARATOR}{location_id}"
            )));
        }
        if service_id.contains(TOPIC_SEPARATOR) {
            return Err(CoreError::invalid_topic(service_id));
        }
        Ok(Self(format!("{service_id}{TOPIC_SEPARATOR}{location_id}")))
    }

    /// Parses a topic from its canonical `"<service_id>_<location_id>"` form.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidTopic` if the separator is missing or
    /// either half is empty.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        match raw.split_once(TOPIC_SEPARATOR) {
            Some((service, location)) if !service.is_empty() && !location.is_empty() => {
                Ok(Self(raw.to_string()))
            }
            _ => Err(CoreError::invalid_topic(raw)),
        }
    }

    /// The service half of the key.
    pub fn service_id(&self) -> &str {
        self.0
            .split_once(TOPIC_SEPARATOR)
            .map(|(service, _)| service)
            .unwrap_or(&self.0)
    }

    /// The location half of the key.
    pub fn location_id(&self) -> &str {
        self.0
            .split_once(TOPIC_SEPARATOR)
            .map(|(_, location)| location)
            .unwrap_or("")
    }

    /// The canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Topic {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A bookable service offered by the municipality.
///
/// The name is cosmetic: it only ever appears in notification text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
}

impl Service {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A device's watch on one topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// Store-assigned unique id.
    pub id: String,

    /// Opaque push registration token identifying the device.
    pub token: String,

    /// The watched topic.
    pub topic: Topic,

    /// When the watch was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Denormalized per-topic counters, stored under the topic key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicCounters {
    /// Number of live subscriptions for the topic.
    #[serde(default)]
    pub active: i64,

    /// Total successful deliveries for the topic, monotonically increasing.
    #[serde(default)]
    pub delivered: i64,
}

/// Outcome of one push delivery attempt to one device token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryOutcome {
    /// The provider accepted the message for this token.
    Delivered,
    /// The token is malformed or was never valid.
    InvalidToken,
    /// The token was valid once but the device unregistered.
    NotRegistered,
    /// Any other per-token error, including rate limiting. Retryable.
    Other,
}

impl DeliveryOutcome {
    /// Whether the device can never be reached with this token again.
    pub fn is_permanent_failure(self) -> bool {
        matches!(self, Self::InvalidToken | Self::NotRegistered)
    }

    pub fn is_delivered(self) -> bool {
        matches!(self, Self::Delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_round_trip() {
        let topic = Topic::new("5", "12").unwrap();
        assert_eq!(topic.as_str(), "5_12");
        assert_eq!(topic.service_id(), "5");
        assert_eq!(topic.location_id(), "12");
        assert_eq!(Topic::parse("5_12").unwrap(), topic);
    }

    #[test]
    fn test_topic_location_may_contain_separator() {
        let topic = Topic::parse("5_12_b").unwrap();
        assert_eq!(topic.service_id(), "5");
        assert_eq!(topic.location_id(), "12_b");
    }

    #[test]
    fn test_topic_rejects_malformed_keys() {
        assert!(Topic::parse("").is_err());
        assert!(Topic::parse("5").is_err());
        assert!(Topic::parse("_12").is_err());
        assert!(Topic::parse("5_").is_err());
        assert!(Topic::new("", "12").is_err());
        assert!(Topic::new("5_1", "2").is_err());
    }

    #[test]
    fn test_topic_serde_is_transparent() {
        let topic = Topic::parse("5_12").unwrap();
        assert_eq!(serde_json::to_string(&topic).unwrap(), "\"5_12\"");
        let parsed: Topic = serde_json::from_str("\"5_12\"").unwrap();
        assert_eq!(parsed, topic);
    }

    #[test]
    fn test_outcome_predicates() {
        assert!(DeliveryOutcome::Delivered.is_delivered());
        assert!(DeliveryOutcome::InvalidToken.is_permanent_failure());
        assert!(DeliveryOutcome::NotRegistered.is_permanent_failure());
        assert!(!DeliveryOutcome::Other.is_permanent_failure());
        assert!(!DeliveryOutcome::Other.is_delivered());
    }
}
