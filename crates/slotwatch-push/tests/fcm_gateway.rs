use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use slotwatch_core::DeliveryOutcome;
use slotwatch_push::{FcmGateway, MulticastMessage, PushGateway, PushLinks};

fn links() -> PushLinks {
    PushLinks {
        icon_url: "https://portal.example/logo.png".into(),
        portal_url: "https://portal.example/booking".into(),
    }
}

fn message(tokens: &[&str]) -> MulticastMessage {
    MulticastMessage::for_service(
        "Census office",
        tokens.iter().map(|t| t.to_string()).collect(),
        &links(),
    )
}

async fn gateway(server: &MockServer) -> FcmGateway {
    FcmGateway::new(
        format!("{}/fcm/send", server.uri()),
        "test-key",
        Duration::from_secs(2),
    )
}

#[tokio::test]
async fn outcomes_follow_token_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fcm/send"))
        .and(header("authorization", "key=test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"message_id": "m:1"},
                {"error": "InvalidRegistration"},
                {"error": "NotRegistered"},
                {"error": "Unavailable"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcomes = gateway(&server)
        .await
        .send_multicast(&message(&["t1", "t2", "t3", "t4"]))
        .await
        .unwrap();

    assert_eq!(
        outcomes,
        vec![
            DeliveryOutcome::Delivered,
            DeliveryOutcome::InvalidToken,
            DeliveryOutcome::NotRegistered,
            DeliveryOutcome::Other,
        ]
    );
}

#[tokio::test]
async fn auth_rejection_is_a_provider_level_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fcm/send"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = gateway(&server)
        .await
        .send_multicast(&message(&["t1"]))
        .await
        .unwrap_err();
    assert!(matches!(err, slotwatch_push::PushError::Auth(_)));
}

#[tokio::test]
async fn server_error_yields_no_outcomes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fcm/send"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert!(
        gateway(&server)
            .await
            .send_multicast(&message(&["t1"]))
            .await
            .is_err()
    );
}

#[tokio::test]
async fn malformed_body_yields_no_outcomes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fcm/send"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    assert!(
        gateway(&server)
            .await
            .send_multicast(&message(&["t1"]))
            .await
            .is_err()
    );
}

#[tokio::test]
async fn result_count_mismatch_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fcm/send"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"message_id": "m:1"}]
        })))
        .mount(&server)
        .await;

    let err = gateway(&server)
        .await
        .send_multicast(&message(&["t1", "t2"]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        slotwatch_push::PushError::InvalidResponse(_)
    ));
}
