use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::messaging::config::PushConfiguration;
use crate::messaging::constants::{INIT_MESSAGE_TYPE, PUSH_MESSAGE_TYPE};

/// `notification` block of a transport-native push payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationBlock {
    pub title: Option<String>,
    pub body: Option<String>,
    pub icon: Option<String>,
    pub image: Option<String>,
    pub click_action: Option<String>,
}

/// Push payload in the transport's shape, as received by the worker or the
/// foreground handler.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InboundPushPayload {
    pub notification: Option<NotificationBlock>,
    pub data: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload normalized from either upstream shape.
///
/// `title` is never empty and `url` is at least `/`.
#[derive(Clone, Debug, PartialEq)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    pub icon: Option<String>,
    pub image: Option<String>,
    pub url: String,
    pub raw: Map<String, Value>,
}

impl NotificationPayload {
    pub fn summary(&self) -> PushSummary {
        PushSummary {
            title: self.title.clone(),
            body: self.body.clone(),
            url: self.url.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

/// Options handed to the OS notification center. Field names match the
/// browser's `NotificationOptions` dictionary.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationOptions {
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub renotify: bool,
    pub require_interaction: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub vibrate: Vec<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<NotificationAction>,
    pub data: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NotificationRecord {
    pub title: String,
    pub options: NotificationOptions,
}

impl NotificationRecord {
    pub fn url(&self) -> Option<&str> {
        self.options.data.get("url").and_then(Value::as_str)
    }
}

/// Page to worker channel message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkerMessage {
    #[serde(rename = "INIT_FIREBASE")]
    InitFirebase { config: PushConfiguration },
}

impl WorkerMessage {
    pub fn type_name(&self) -> &'static str {
        match self {
            WorkerMessage::InitFirebase { .. } => INIT_MESSAGE_TYPE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSummary {
    pub title: String,
    pub body: String,
    pub url: String,
}

/// Worker to page channel message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PageMessage {
    #[serde(rename = "PUSH")]
    Push { payload: PushSummary },
}

impl PageMessage {
    pub fn type_name(&self) -> &'static str {
        match self {
            PageMessage::Push { .. } => PUSH_MESSAGE_TYPE,
        }
    }
}

/// Notification permission states as exposed by the Web Notifications API.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    /// The user has not decided whether to allow notifications.
    #[default]
    Default,
    Granted,
    Denied,
}

impl PermissionState {
    pub fn from_str_lossy(value: &str) -> Self {
        match value {
            "granted" => PermissionState::Granted,
            "denied" => PermissionState::Denied,
            _ => PermissionState::Default,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PermissionState::Default => "default",
            PermissionState::Granted => "granted",
            PermissionState::Denied => "denied",
        }
    }
}

/// What happened to one message on one delivery path.
#[derive(Clone, Debug, PartialEq)]
pub enum Delivery {
    Shown(NotificationPayload),
    /// Already shown through another path of the same execution context.
    Duplicate,
    /// The path does not handle this message (wrong shape, not initialized,
    /// permission not granted, ...).
    Ignored,
    /// Showing the notification failed; the failure was logged.
    Failed,
}

impl Delivery {
    pub fn is_shown(&self) -> bool {
        matches!(self, Delivery::Shown(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn init_message_round_trips_wire_shape() {
        let value = json!({
            "type": "INIT_FIREBASE",
            "config": {"apiKey": "k", "projectId": "p", "messagingSenderId": "s", "appId": "a"}
        });
        let message: WorkerMessage = serde_json::from_value(value).unwrap();
        let WorkerMessage::InitFirebase { config } = &message;
        assert!(config.is_complete());
        assert_eq!(message.type_name(), "INIT_FIREBASE");
    }

    #[test]
    fn push_broadcast_has_flat_payload() {
        let message = PageMessage::Push {
            payload: PushSummary {
                title: "A".into(),
                body: "B".into(),
                url: "/x".into(),
            },
        };
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"type": "PUSH", "payload": {"title": "A", "body": "B", "url": "/x"}})
        );
    }

    #[test]
    fn notification_options_use_browser_field_names() {
        let options = NotificationOptions {
            body: "B".into(),
            require_interaction: true,
            vibrate: vec![200, 100, 200],
            ..Default::default()
        };
        let value = serde_json::to_value(&options).unwrap();
        assert_eq!(value["requireInteraction"], json!(true));
        assert_eq!(value["vibrate"], json!([200, 100, 200]));
        assert!(value.get("tag").is_none());
        assert!(value.get("actions").is_none());
    }

    #[test]
    fn permission_state_parses_browser_strings() {
        assert_eq!(PermissionState::from_str_lossy("granted"), PermissionState::Granted);
        assert_eq!(PermissionState::from_str_lossy("denied"), PermissionState::Denied);
        assert_eq!(PermissionState::from_str_lossy("prompt"), PermissionState::Default);
    }
}
