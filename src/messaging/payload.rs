//! Normalization of inbound push payloads into notifications.
//!
//! Two upstream shapes reach the worker. Transport-native payloads carry a
//! `notification` block and/or a `data` block; the `notification` block wins for
//! the visible fields while `data` supplies the click-through URL and any
//! passthrough fields. Payloads from other push senders are flat objects
//! (`title`, `body`/`text`, `url`/`data.url`) and are handled by the legacy
//! path.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{Map, Value};

use crate::messaging::constants::{
    ACTION_DISMISS, ACTION_DISMISS_TITLE, ACTION_VIEW, ACTION_VIEW_TITLE, BADGE_ICON,
    DEFAULT_ICON, DEFAULT_TITLE, DEFAULT_URL, LEGACY_TAG, LEGACY_VIBRATION,
    TRANSPORT_MARKER_FIELDS, TRANSPORT_VIBRATION,
};
use crate::messaging::error::{invalid_argument, malformed_payload, MessagingResult};
use crate::messaging::types::{
    InboundPushPayload, NotificationAction, NotificationOptions, NotificationPayload,
    NotificationRecord,
};

/// Parses the raw bytes of a push event as JSON.
pub fn parse_push_data(data: &[u8]) -> MessagingResult<Value> {
    serde_json::from_slice(data)
        .map_err(|err| malformed_payload(format!("push data is not JSON: {err}")))
}

/// Returns `true` when the payload was produced by the push transport and is
/// therefore handled by the transport listener rather than the legacy one.
pub fn is_transport_native(payload: &Value) -> bool {
    let Some(object) = payload.as_object() else {
        return false;
    };
    object.contains_key("notification")
        || TRANSPORT_MARKER_FIELDS
            .iter()
            .any(|field| object.contains_key(*field))
}

/// A marker-less message that only carries a `data` block. The transport
/// delivers data messages in this shape, while other senders put the visible
/// fields at the top level.
pub fn is_data_message(payload: &Value) -> bool {
    let Some(object) = payload.as_object() else {
        return false;
    };
    object.get("data").is_some_and(Value::is_object)
        && !["title", "body", "text"]
            .iter()
            .any(|field| object.contains_key(*field))
}

pub fn normalize_transport_payload(payload: &InboundPushPayload) -> NotificationPayload {
    let notification = payload.notification.clone().unwrap_or_default();
    let data = payload.data.clone().unwrap_or_default();

    let title = non_blank(notification.title.as_deref())
        .or_else(|| data_str(&data, "title"))
        .unwrap_or(DEFAULT_TITLE)
        .to_string();
    let body = non_blank(notification.body.as_deref())
        .or_else(|| data_str(&data, "body"))
        .unwrap_or_default()
        .to_string();
    let icon = non_blank(notification.icon.as_deref())
        .or_else(|| data_str(&data, "image"))
        .unwrap_or(DEFAULT_ICON)
        .to_string();
    let image = non_blank(notification.image.as_deref())
        .or_else(|| data_str(&data, "image"))
        .map(str::to_string);
    let url = data_str(&data, "url")
        .or_else(|| non_blank(notification.click_action.as_deref()))
        .unwrap_or(DEFAULT_URL)
        .to_string();

    NotificationPayload {
        title,
        body,
        icon: Some(icon),
        image,
        url,
        raw: data,
    }
}

/// Normalizes a payload from a non-transport sender.
pub fn normalize_legacy_payload(payload: &Value) -> NotificationPayload {
    let field = |name: &str| non_blank(payload.get(name).and_then(Value::as_str));
    let nested_url = non_blank(
        payload
            .get("data")
            .and_then(|data| data.get("url"))
            .and_then(Value::as_str),
    );

    let raw = payload
        .get("data")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    NotificationPayload {
        title: field("title").unwrap_or(DEFAULT_TITLE).to_string(),
        body: field("body")
            .or_else(|| field("text"))
            .unwrap_or_default()
            .to_string(),
        icon: Some(field("icon").unwrap_or(DEFAULT_ICON).to_string()),
        image: field("image").map(str::to_string),
        url: field("url").or(nested_url).unwrap_or(DEFAULT_URL).to_string(),
        raw,
    }
}

/// Notification shown by the worker for a transport-native message.
pub fn transport_record(payload: &NotificationPayload) -> NotificationRecord {
    NotificationRecord {
        title: payload.title.clone(),
        options: NotificationOptions {
            body: payload.body.clone(),
            icon: payload.icon.clone(),
            badge: Some(BADGE_ICON.to_string()),
            image: payload.image.clone(),
            tag: None,
            renotify: false,
            require_interaction: true,
            vibrate: TRANSPORT_VIBRATION.to_vec(),
            actions: vec![
                NotificationAction {
                    action: ACTION_VIEW.to_string(),
                    title: ACTION_VIEW_TITLE.to_string(),
                },
                NotificationAction {
                    action: ACTION_DISMISS.to_string(),
                    title: ACTION_DISMISS_TITLE.to_string(),
                },
            ],
            data: click_data(payload),
        },
    }
}

/// Notification shown by the legacy listener. The fixed tag lets the browser
/// replace an earlier update notification instead of stacking a new one.
pub fn legacy_record(payload: &NotificationPayload) -> NotificationRecord {
    NotificationRecord {
        title: payload.title.clone(),
        options: NotificationOptions {
            body: payload.body.clone(),
            icon: payload.icon.clone(),
            badge: Some(BADGE_ICON.to_string()),
            image: payload.image.clone(),
            tag: Some(LEGACY_TAG.to_string()),
            renotify: true,
            require_interaction: true,
            vibrate: LEGACY_VIBRATION.to_vec(),
            actions: Vec::new(),
            data: click_data(payload),
        },
    }
}

/// Local notification shown from a page, either for a foreground message or
/// for a relayed `PUSH` broadcast.
pub fn page_record(title: &str, body: &str, url: &str) -> NotificationRecord {
    let mut data = Map::new();
    data.insert("url".to_string(), Value::String(url.to_string()));
    NotificationRecord {
        title: title.to_string(),
        options: NotificationOptions {
            body: body.to_string(),
            icon: Some(DEFAULT_ICON.to_string()),
            data,
            ..Default::default()
        },
    }
}

/// Title, body and URL used by the foreground handler, which only looks at the
/// `notification` block for the visible text.
pub fn foreground_fields(payload: &InboundPushPayload) -> (String, String, String) {
    let notification = payload.notification.clone().unwrap_or_default();
    let normalized = normalize_transport_payload(payload);
    let title = non_blank(notification.title.as_deref())
        .unwrap_or(DEFAULT_TITLE)
        .to_string();
    let body = notification.body.unwrap_or_default();
    (title, body, normalized.url)
}

/// Decodes a VAPID public key (URL-safe base64 without padding).
pub fn decode_vapid_key(vapid_key: &str) -> MessagingResult<Vec<u8>> {
    let trimmed = vapid_key.trim().trim_end_matches('=');
    if trimmed.is_empty() {
        return Err(invalid_argument("VAPID key must not be empty"));
    }
    URL_SAFE_NO_PAD
        .decode(trimmed)
        .map_err(|err| invalid_argument(format!("Invalid VAPID key: {err}")))
}

fn click_data(payload: &NotificationPayload) -> Map<String, Value> {
    let mut data = payload.raw.clone();
    data.insert("url".to_string(), Value::String(payload.url.clone()));
    data
}

fn data_str<'a>(data: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    non_blank(data.get(key).and_then(Value::as_str))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}
