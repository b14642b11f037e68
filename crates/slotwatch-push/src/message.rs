//! Multicast message construction.
//!
//! One message per service, addressed to every device token watching one of
//! the service's topics. The shape follows the provider's legacy multicast
//! JSON: a flat notification block plus webpush options carrying the
//! urgency hint, icon and click-through link back to the booking portal.

use serde::{Deserialize, Serialize};

const TITLE: &str = "New appointments available";

/// Static links embedded in every notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushLinks {
    /// Icon shown by the platform notification UI.
    pub icon_url: String,
    /// Click-through target, the booking portal's landing page.
    pub portal_url: String,
}

/// A multicast push request for one service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MulticastMessage {
    pub registration_ids: Vec<String>,
    pub notification: NotificationContent,
    pub webpush: WebPushOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebPushOptions {
    pub headers: WebPushHeaders,
    pub notification: WebPushNotification,
    pub fcm_options: WebPushFcmOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebPushHeaders {
    pub urgency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebPushNotification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub click_action: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebPushFcmOptions {
    pub link: String,
}

impl MulticastMessage {
    /// Builds the notification for one service, naming it in the body.
    pub fn for_service(service_name: &str, tokens: Vec<String>, links: &PushLinks) -> Self {
        let body = format!("Check appointments for {service_name}");
        Self {
            registration_ids: tokens,
            notification: NotificationContent {
                title: TITLE.to_string(),
                body: body.clone(),
            },
            webpush: WebPushOptions {
                headers: WebPushHeaders {
                    urgency: "high".to_string(),
                },
                notification: WebPushNotification {
                    title: TITLE.to_string(),
                    body,
                    icon: links.icon_url.clone(),
                    click_action: links.portal_url.clone(),
                },
                fcm_options: WebPushFcmOptions {
                    link: links.portal_url.clone(),
                },
            },
        }
    }

    /// Number of addressed tokens.
    pub fn token_count(&self) -> usize {
        self.registration_ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_json_diff::assert_json_include;
    use serde_json::json;

    fn links() -> PushLinks {
        PushLinks {
            icon_url: "https://portal.example/logo.png".into(),
            portal_url: "https://portal.example/booking".into(),
        }
    }

    #[test]
    fn test_message_names_the_service() {
        let msg = MulticastMessage::for_service("Census office", vec!["t1".into()], &links());
        assert_eq!(msg.notification.title, "New appointments available");
        assert_eq!(msg.notification.body, "Check appointments for Census office");
        assert_eq!(msg.webpush.notification.body, msg.notification.body);
    }

    #[test]
    fn test_message_wire_shape() {
        let msg = MulticastMessage::for_service(
            "Census office",
            vec!["t1".into(), "t2".into()],
            &links(),
        );
        let actual = serde_json::to_value(&msg).unwrap();
        assert_json_include!(
            actual: actual,
            expected: json!({
                "registration_ids": ["t1", "t2"],
                "webpush": {
                    "headers": {"urgency": "high"},
                    "notification": {
                        "icon": "https://portal.example/logo.png",
                        "click_action": "https://portal.example/booking"
                    },
                    "fcm_options": {"link": "https://portal.example/booking"}
                }
            })
        );
    }
}
