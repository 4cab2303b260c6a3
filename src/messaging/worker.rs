//! Background worker: the only process guaranteed to be running when a push
//! arrives.
//!
//! The worker keeps its transport state in memory only. After every respawn it
//! starts `Uninitialized` again and waits for a page to re-send
//! `INIT_FIREBASE`. Each push or click event is handled on its own; failures
//! are logged and never escape a handler.

use std::sync::{Arc, Mutex};

use futures::future::join_all;
use serde_json::Value;

use crate::messaging::config::PushConfiguration;
use crate::messaging::constants::ACTION_DISMISS;
use crate::messaging::dedup::{DedupPolicy, DeliveryDedup};
use crate::messaging::logger::LOGGER;
use crate::messaging::payload::{
    is_data_message, is_transport_native, legacy_record, normalize_legacy_payload,
    normalize_transport_payload, parse_push_data, transport_record,
};
use crate::messaging::platform::{
    ClickedNotification, ClientDirectory, NotificationCenter, PushTransport, TransportHandle,
};
use crate::messaging::routing::{target_url, ClickRouting};
use crate::messaging::types::{
    Delivery, InboundPushPayload, NotificationPayload, NotificationRecord, PageMessage,
    WorkerMessage,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum WorkerState {
    #[default]
    Uninitialized,
    Initialized(TransportHandle),
}

impl WorkerState {
    pub fn is_initialized(&self) -> bool {
        matches!(self, WorkerState::Initialized(_))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InitOutcome {
    Initialized,
    AlreadyInitialized,
    /// The configuration lacks identity fields; the worker keeps running
    /// without notification support.
    Skipped { missing: Vec<&'static str> },
    /// The transport rejected the configuration.
    Failed,
}

/// Result of running both push listeners for one push event.
#[derive(Clone, Debug, PartialEq)]
pub struct PushDispatch {
    pub transport: Delivery,
    pub legacy: Delivery,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClickOutcome {
    Dismissed,
    Focused { client_id: String, url: String },
    Opened { url: String },
    Failed,
}

pub struct BackgroundWorker {
    transport: Arc<dyn PushTransport>,
    notifications: Arc<dyn NotificationCenter>,
    clients: Arc<dyn ClientDirectory>,
    state: Mutex<WorkerState>,
    dedup: DeliveryDedup,
    routing: ClickRouting,
}

impl BackgroundWorker {
    pub fn new(
        transport: Arc<dyn PushTransport>,
        notifications: Arc<dyn NotificationCenter>,
        clients: Arc<dyn ClientDirectory>,
    ) -> Self {
        Self {
            transport,
            notifications,
            clients,
            state: Mutex::new(WorkerState::Uninitialized),
            dedup: DeliveryDedup::default(),
            routing: ClickRouting::default(),
        }
    }

    pub fn with_dedup_policy(mut self, policy: DedupPolicy) -> Self {
        self.dedup = DeliveryDedup::new(policy);
        self
    }

    pub fn with_click_routing(mut self, routing: ClickRouting) -> Self {
        self.routing = routing;
        self
    }

    pub fn state(&self) -> WorkerState {
        self.state.lock().unwrap().clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().unwrap().is_initialized()
    }

    /// Handles a message posted by a page.
    pub fn handle_message(&self, message: &WorkerMessage) -> InitOutcome {
        match message {
            WorkerMessage::InitFirebase { config } => self.initialize(config),
        }
    }

    /// Handles an untyped `message` event payload. Anything that is not a
    /// known channel message is ignored.
    pub fn handle_raw_message(&self, value: &Value) -> Option<InitOutcome> {
        match serde_json::from_value::<WorkerMessage>(value.clone()) {
            Ok(message) => Some(self.handle_message(&message)),
            Err(err) => {
                LOGGER.debug(format!("Ignoring unrecognized worker message: {err}"));
                None
            }
        }
    }

    fn initialize(&self, config: &PushConfiguration) -> InitOutcome {
        let mut state = self.state.lock().unwrap();
        if state.is_initialized() {
            return InitOutcome::AlreadyInitialized;
        }

        let missing = config.missing_identity_fields();
        if !missing.is_empty() {
            LOGGER.debug(format!(
                "Worker init skipped, configuration is missing: {}",
                missing.join(", ")
            ));
            return InitOutcome::Skipped { missing };
        }

        match self.transport.initialize(config) {
            Ok(handle) => {
                LOGGER.info(format!(
                    "Worker messaging initialized for project {}",
                    handle.project_id()
                ));
                *state = WorkerState::Initialized(handle);
                InitOutcome::Initialized
            }
            Err(err) => {
                LOGGER.warn(format!("Worker messaging initialization failed: {err}"));
                InitOutcome::Failed
            }
        }
    }

    /// Runs both push listeners the worker registers, the way the platform
    /// dispatches one `push` event to each of them.
    pub async fn on_push(&self, data: Option<&[u8]>) -> PushDispatch {
        let transport = match data.map(parse_push_data) {
            Some(Ok(value)) if self.is_initialized() && self.is_transport_payload(&value) => {
                match serde_json::from_value::<InboundPushPayload>(value) {
                    Ok(payload) => self.handle_transport_message(&payload).await,
                    Err(err) => {
                        LOGGER.debug(format!("Transport payload has an unexpected shape: {err}"));
                        Delivery::Ignored
                    }
                }
            }
            _ => Delivery::Ignored,
        };
        let legacy = self.handle_legacy_push(data).await;
        PushDispatch { transport, legacy }
    }

    /// Payloads the transport listener owns. Marker-less data messages only
    /// count once the transport is up; before that the legacy listener shows
    /// them.
    fn is_transport_payload(&self, value: &Value) -> bool {
        is_transport_native(value) || (is_data_message(value) && self.is_initialized())
    }

    /// Transport listener: show the notification, then relay a summary to every
    /// open window so pages can react without their own transport handler.
    pub async fn handle_transport_message(&self, payload: &InboundPushPayload) -> Delivery {
        let normalized = normalize_transport_payload(payload);
        let record = transport_record(&normalized);
        match self.show_once(&normalized, &record).await {
            Delivery::Shown(normalized) => {
                self.broadcast(&normalized).await;
                Delivery::Shown(normalized)
            }
            other => other,
        }
    }

    /// Legacy listener for push senders other than the transport. Never fails:
    /// unparsable data and transport-native payloads are ignored.
    pub async fn handle_legacy_push(&self, data: Option<&[u8]>) -> Delivery {
        let Some(data) = data else {
            return Delivery::Ignored;
        };
        let value = match parse_push_data(data) {
            Ok(value) => value,
            Err(err) => {
                LOGGER.debug(format!("Legacy push ignored: {err}"));
                return Delivery::Ignored;
            }
        };
        if !value.is_object() || self.is_transport_payload(&value) {
            return Delivery::Ignored;
        }

        let normalized = normalize_legacy_payload(&value);
        let record = legacy_record(&normalized);
        self.show_once(&normalized, &record).await
    }

    async fn show_once(&self, payload: &NotificationPayload, record: &NotificationRecord) -> Delivery {
        if !self.dedup.first_delivery(&payload.title, &payload.body) {
            LOGGER.debug(format!("Suppressed duplicate notification '{}'", payload.title));
            return Delivery::Duplicate;
        }
        match self.notifications.show(record).await {
            Ok(()) => Delivery::Shown(payload.clone()),
            Err(err) => {
                LOGGER.warn(format!("Failed to show notification: {err}"));
                Delivery::Failed
            }
        }
    }

    async fn broadcast(&self, payload: &NotificationPayload) {
        let clients = match self.clients.window_clients().await {
            Ok(clients) => clients,
            Err(err) => {
                LOGGER.warn(format!("Could not enumerate clients for broadcast: {err}"));
                return;
            }
        };
        let message = PageMessage::Push {
            payload: payload.summary(),
        };
        let posts = clients.iter().map(|client| {
            let message = &message;
            async move {
                if let Err(err) = self.clients.post_message(&client.id, message).await {
                    LOGGER.debug(format!("Broadcast to client {} failed: {err}", client.id));
                }
            }
        });
        join_all(posts).await;
    }

    /// `notificationclick` handler.
    pub async fn handle_notification_click(
        &self,
        notification: &dyn ClickedNotification,
    ) -> ClickOutcome {
        notification.close();
        if notification.action().as_deref() == Some(ACTION_DISMISS) {
            return ClickOutcome::Dismissed;
        }

        let url = target_url(notification.data().as_ref());
        let clients = match self.clients.window_clients().await {
            Ok(clients) => clients,
            Err(err) => {
                LOGGER.warn(format!("Could not enumerate clients for click: {err}"));
                Vec::new()
            }
        };

        if let Some(client) = clients
            .iter()
            .find(|client| self.routing.matches(&client.url, &url))
        {
            return match self.clients.focus(&client.id).await {
                Ok(()) => ClickOutcome::Focused {
                    client_id: client.id.clone(),
                    url,
                },
                Err(err) => {
                    LOGGER.warn(format!("Failed to focus client {}: {err}", client.id));
                    ClickOutcome::Failed
                }
            };
        }

        match self.clients.open_window(&url).await {
            Ok(()) => ClickOutcome::Opened { url },
            Err(err) => {
                LOGGER.warn(format!("Failed to open window at {url}: {err}"));
                ClickOutcome::Failed
            }
        }
    }
}
