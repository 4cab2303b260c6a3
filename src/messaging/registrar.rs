//! Opt-in flow for push notifications and the small prompt that drives it.

use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::messaging::constants::{PROMPT_ALLOW_LABEL, PROMPT_LATER_LABEL, SERVICE_WORKER_PATH};
use crate::messaging::foreground::ForegroundMessagingClient;
use crate::messaging::logger::LOGGER;
use crate::messaging::payload::page_record;
use crate::messaging::platform::TokenRegistry;
use crate::messaging::types::{Delivery, NotificationPayload, PageMessage, PermissionState};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MountOutcome {
    /// The browser has no service worker or push manager support.
    Unsupported,
    Mounted { token: Option<String> },
}

/// What the corner prompt should render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PromptView {
    Banner {
        allow_label: &'static str,
        later_label: &'static str,
    },
    Hidden,
}

#[derive(Debug, Default)]
struct RegistrarState {
    mounted: bool,
    permission: PermissionState,
}

pub struct SubscriptionRegistrar {
    client: Arc<ForegroundMessagingClient>,
    registry: Arc<dyn TokenRegistry>,
    state: Mutex<RegistrarState>,
}

impl SubscriptionRegistrar {
    pub fn new(client: Arc<ForegroundMessagingClient>, registry: Arc<dyn TokenRegistry>) -> Self {
        Self {
            client,
            registry,
            state: Mutex::new(RegistrarState::default()),
        }
    }

    pub fn client(&self) -> &Arc<ForegroundMessagingClient> {
        &self.client
    }

    pub fn is_mounted(&self) -> bool {
        self.state.lock().unwrap().mounted
    }

    /// Local permission state. May be `Denied` while the browser still reports
    /// `default`, after the user picked "Later".
    pub fn permission(&self) -> PermissionState {
        self.state.lock().unwrap().permission
    }

    pub async fn mount(&self) -> MountOutcome {
        let services = self.client.services();
        if !services.container.capabilities().supports_push() {
            LOGGER.info("Push notifications are not supported in this browser");
            return MountOutcome::Unsupported;
        }

        if let Err(err) = services.container.register(SERVICE_WORKER_PATH).await {
            LOGGER.error(format!("Service worker registration failed: {err}"));
        }
        if let Err(err) = self.client.attach_foreground_handler() {
            LOGGER.debug(format!("Foreground handler not attached: {err}"));
        }

        let permission = services.permissions.current();
        {
            let mut state = self.state.lock().unwrap();
            state.mounted = true;
            state.permission = permission;
        }

        if permission != PermissionState::Granted {
            return MountOutcome::Mounted { token: None };
        }
        let token = self.acquire_and_register().await;
        MountOutcome::Mounted { token }
    }

    /// Token acquisition followed by backend registration. Nothing is retried.
    async fn acquire_and_register(&self) -> Option<String> {
        let token = match self.client.request_permission_and_token().await {
            Ok(Some(token)) => token,
            Ok(None) => return None,
            Err(err) => {
                LOGGER.error(format!("Could not obtain a push token: {err}"));
                return None;
            }
        };

        self.state.lock().unwrap().permission = PermissionState::Granted;
        match self.registry.register(&token).await {
            Ok(()) => LOGGER.info("Push token registered with the backend"),
            Err(err) => LOGGER.error(format!("Push token registration failed: {err}")),
        }
        Some(token)
    }

    /// "Allow": asks the browser for permission and, once granted, registers
    /// a token.
    pub async fn enable_notifications(&self) -> PermissionState {
        let permissions = &self.client.services().permissions;
        let permission = match permissions.request().await {
            Ok(permission) => permission,
            Err(err) => {
                LOGGER.warn(format!("Permission request failed: {err}"));
                permissions.current()
            }
        };
        self.state.lock().unwrap().permission = permission;

        if permission == PermissionState::Granted {
            self.acquire_and_register().await;
        }
        self.permission()
    }

    /// "Later": hides the prompt for this session. The browser permission is
    /// left untouched.
    pub fn dismiss_prompt(&self) {
        self.state.lock().unwrap().permission = PermissionState::Denied;
    }

    pub fn prompt(&self) -> PromptView {
        let state = self.state.lock().unwrap();
        if state.mounted && state.permission == PermissionState::Default {
            PromptView::Banner {
                allow_label: PROMPT_ALLOW_LABEL,
                later_label: PROMPT_LATER_LABEL,
            }
        } else {
            PromptView::Hidden
        }
    }

    /// Handles a message relayed by the worker.
    pub async fn handle_page_message(&self, message: &PageMessage) -> Delivery {
        if !self.is_mounted() {
            return Delivery::Ignored;
        }
        let services = self.client.services();
        if services.permissions.current() != PermissionState::Granted {
            return Delivery::Ignored;
        }

        let PageMessage::Push { payload } = message;
        if !self.client.dedup().first_delivery(&payload.title, &payload.body) {
            LOGGER.debug(format!("Suppressed duplicate relayed push '{}'", payload.title));
            return Delivery::Duplicate;
        }

        let record = page_record(&payload.title, &payload.body, &payload.url);
        match services.notifications.show(&record).await {
            Ok(()) => Delivery::Shown(NotificationPayload {
                title: payload.title.clone(),
                body: payload.body.clone(),
                icon: record.options.icon.clone(),
                image: None,
                url: payload.url.clone(),
                raw: Default::default(),
            }),
            Err(err) => {
                LOGGER.warn(format!("Failed to show relayed notification: {err}"));
                Delivery::Failed
            }
        }
    }

    /// Untyped variant of [`handle_page_message`](Self::handle_page_message)
    /// for raw `message` event data.
    pub async fn handle_raw_page_message(&self, value: &Value) -> Delivery {
        match serde_json::from_value::<PageMessage>(value.clone()) {
            Ok(message) => self.handle_page_message(&message).await,
            Err(_) => Delivery::Ignored,
        }
    }

    pub fn unmount(&self) {
        self.state.lock().unwrap().mounted = false;
    }
}
