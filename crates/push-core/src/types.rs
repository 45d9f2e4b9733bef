use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Logical state of the broker stream connection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No stream is up. The transport may still be retrying in the background.
    #[default]
    Disconnected,
    /// `connect` accepted a token and the first handshake is in flight.
    Connecting,
    /// The transport reported a completed handshake.
    Connected,
}

/// A message pushed by the broker. Immutable once received.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Broker-assigned id, unique per broker instance.
    pub id: i64,
    /// Publishing application on the broker.
    #[serde(alias = "appid")]
    pub app_id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(alias = "message", default)]
    pub body: String,
    /// 0-10 inclusive on a well-behaved broker.
    #[serde(default)]
    pub priority: i32,
    /// ISO-8601 timestamp as sent by the broker.
    #[serde(alias = "date", default)]
    pub timestamp: String,
    /// Opaque navigation payload (`userId`, `type`, `orderId`, ...).
    #[serde(default)]
    pub extras: Map<String, Value>,
}

/// Device-level importance of a channel or a single notification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Low,
    Default,
    High,
}

/// A notification channel declared with the local-notification subsystem.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationChannel {
    pub id: &'static str,
    pub display_name: &'static str,
    pub importance: Importance,
    pub sound_enabled: bool,
    pub vibration_enabled: bool,
}

/// Presentation attributes selected for one inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub channel_id: &'static str,
    pub importance: Importance,
    pub sound_enabled: bool,
    /// Alternating off/on durations in milliseconds.
    pub vibration_pattern: Option<Vec<u64>>,
}

/// Request handed to the local-notification subsystem for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayRequest {
    pub title: String,
    pub body: String,
    /// Tap-navigation payload, the message extras unmodified.
    pub data: Map<String, Value>,
    pub channel_id: &'static str,
    pub importance: Importance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vibration_pattern: Option<Vec<u64>>,
}

impl DisplayRequest {
    /// Combine a message with its routing decision.
    pub fn for_message(message: &Message, route: Route) -> Self {
        Self {
            title: message.title.clone(),
            body: message.body.clone(),
            data: message.extras.clone(),
            channel_id: route.channel_id,
            importance: route.importance,
            sound: route.sound_enabled.then_some(true),
            vibration_pattern: route.vibration_pattern,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_broker_native_field_names() {
        let message: Message = serde_json::from_value(json!({
            "id": 25,
            "appid": 3,
            "title": "Order shipped",
            "message": "Your box is on the way",
            "priority": 8,
            "date": "2024-03-01T10:00:00Z",
            "extras": { "orderId": "42", "type": "order" }
        }))
        .expect("native message should parse");

        assert_eq!(message.app_id, 3);
        assert_eq!(message.body, "Your box is on the way");
        assert_eq!(message.timestamp, "2024-03-01T10:00:00Z");
        assert_eq!(message.extras.get("orderId"), Some(&json!("42")));
    }

    #[test]
    fn parses_camel_case_names_and_defaults_extras() {
        let message: Message = serde_json::from_value(json!({
            "id": 1,
            "appId": 9,
            "title": "Hi",
            "body": "there",
            "priority": 2,
            "timestamp": "2024-03-01T10:00:00Z"
        }))
        .expect("camelCase message should parse");

        assert_eq!(message.app_id, 9);
        assert_eq!(message.body, "there");
        assert!(message.extras.is_empty());
    }

    #[test]
    fn display_request_carries_extras_untouched() {
        let mut extras = Map::new();
        extras.insert("orderId".into(), json!("42"));
        extras.insert("nested".into(), json!({ "a": [1, 2] }));
        let message = Message {
            id: 1,
            app_id: 1,
            title: "t".into(),
            body: "b".into(),
            priority: 3,
            timestamp: String::new(),
            extras: extras.clone(),
        };

        let request = DisplayRequest::for_message(
            &message,
            Route {
                channel_id: "normal",
                importance: Importance::Low,
                sound_enabled: false,
                vibration_pattern: None,
            },
        );

        assert_eq!(request.data, extras);
        assert_eq!(request.sound, None);
        let wire = serde_json::to_value(&request).expect("request should serialize");
        assert_eq!(wire["channelId"], json!("normal"));
        assert!(wire.get("vibrationPattern").is_none());
    }
}
