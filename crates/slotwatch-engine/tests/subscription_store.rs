use std::collections::HashSet;
use std::sync::Arc;

use slotwatch_core::Topic;
use slotwatch_db_memory::MemoryStore;
use slotwatch_engine::{EngineError, SubscriptionStore, TopicRegistry};

fn topic(raw: &str) -> Topic {
    Topic::parse(raw).unwrap()
}

fn setup() -> (Arc<MemoryStore>, SubscriptionStore) {
    let store = Arc::new(MemoryStore::new());
    let subscriptions = SubscriptionStore::new(store.clone());
    (store, subscriptions)
}

#[tokio::test]
async fn subscribe_then_listed_for_token() {
    let (_, subscriptions) = setup();
    let t = topic("5_12");

    let id = subscriptions.subscribe("tok-1", &t).await.unwrap();
    assert!(!id.is_empty());

    let listed = subscriptions.subscriptions_for_token("tok-1").await.unwrap();
    assert_eq!(listed.get(&t), Some(&id));

    let counters = subscriptions.topic_counters(&t).await.unwrap().unwrap();
    assert_eq!(counters.active, 1);
}

#[tokio::test]
async fn double_subscribe_is_deduplicated() {
    let (_, subscriptions) = setup();
    let t = topic("5_12");

    let first = subscriptions.subscribe("tok-1", &t).await.unwrap();
    let second = subscriptions.subscribe("tok-1", &t).await.unwrap();
    assert_eq!(first, second);

    let listed = subscriptions.subscriptions_for_token("tok-1").await.unwrap();
    assert_eq!(listed.len(), 1);

    // The duplicate call must not bump the counter either.
    let counters = subscriptions.topic_counters(&t).await.unwrap().unwrap();
    assert_eq!(counters.active, 1);
}

#[tokio::test]
async fn unsubscribe_removes_watch_and_topic() {
    let (store, subscriptions) = setup();
    let registry = TopicRegistry::new(store);
    let t = topic("5_12");

    let id = subscriptions.subscribe("tok-1", &t).await.unwrap();
    assert!(registry.active_topics().await.contains(&t));

    subscriptions.unsubscribe(&t, &id).await.unwrap();

    let listed = subscriptions.subscriptions_for_token("tok-1").await.unwrap();
    assert!(listed.is_empty());

    let counters = subscriptions.topic_counters(&t).await.unwrap().unwrap();
    assert_eq!(counters.active, 0);

    // Topics without live subscribers never come back from the registry.
    assert!(registry.active_topics().await.is_empty());
}

#[tokio::test]
async fn unsubscribe_unknown_id_is_not_found() {
    let (_, subscriptions) = setup();
    let err = subscriptions
        .unsubscribe(&topic("5_12"), "no-such-id")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SubscriptionNotFound(_)));
}

#[tokio::test]
async fn empty_arguments_are_rejected() {
    let (_, subscriptions) = setup();
    let err = subscriptions.subscribe("", &topic("5_12")).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidArgument { .. }));

    let err = subscriptions
        .unsubscribe(&topic("5_12"), "")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidArgument { .. }));
}

#[tokio::test]
async fn topic_set_larger_than_query_limit_is_chunked() {
    let (store, subscriptions) = setup();
    assert!(slotwatch_storage::DocumentStore::max_in_values(store.as_ref()) < 12);

    let mut topics = HashSet::new();
    for location in 1..=12 {
        let t = topic(&format!("5_{location}"));
        subscriptions
            .subscribe(&format!("tok-{location}"), &t)
            .await
            .unwrap();
        topics.insert(t);
    }

    let grouped = subscriptions
        .subscriptions_for_topics(&topics)
        .await
        .unwrap();
    let group = grouped.get("5").expect("service group present");
    assert_eq!(group.len(), 12);

    let covered: HashSet<Topic> = group.iter().map(|s| s.topic.clone()).collect();
    assert_eq!(covered, topics);
}
