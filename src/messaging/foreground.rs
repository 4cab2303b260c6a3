//! Page-side messaging client.
//!
//! Initializes the transport inside an open page, hands the configuration to
//! the background worker and shows local notifications for messages the page
//! receives while it is in the foreground.

use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::messaging::config::{ConfigGate, PushConfiguration};
use crate::messaging::constants::{DEFAULT_ICON, SERVICE_WORKER_PATH};
use crate::messaging::dedup::{DedupPolicy, DeliveryDedup};
use crate::messaging::error::{not_initialized, MessagingResult};
use crate::messaging::logger::LOGGER;
use crate::messaging::payload::{foreground_fields, normalize_transport_payload, page_record};
use crate::messaging::platform::{
    DeliveryFuture, ForegroundListener, NotificationCenter, PermissionController, PushTransport,
    TransportHandle, WorkerContainer, WorkerRegistration,
};
use crate::messaging::types::{
    Delivery, InboundPushPayload, NotificationPayload, PermissionState, WorkerMessage,
};

/// Browser services available to a page.
#[derive(Clone)]
pub struct PageServices {
    pub transport: Arc<dyn PushTransport>,
    pub container: Arc<dyn WorkerContainer>,
    pub permissions: Arc<dyn PermissionController>,
    pub notifications: Arc<dyn NotificationCenter>,
}

#[derive(Default)]
struct ForegroundState {
    handle: Option<TransportHandle>,
    handler_attached: bool,
}

pub struct ForegroundMessagingClient {
    config: PushConfiguration,
    services: PageServices,
    dedup: Arc<DeliveryDedup>,
    state: Mutex<ForegroundState>,
}

impl ForegroundMessagingClient {
    pub fn new(config: PushConfiguration, services: PageServices) -> Self {
        Self {
            config,
            services,
            dedup: Arc::new(DeliveryDedup::default()),
            state: Mutex::new(ForegroundState::default()),
        }
    }

    pub fn with_dedup_policy(mut self, policy: DedupPolicy) -> Self {
        self.dedup = Arc::new(DeliveryDedup::new(policy));
        self
    }

    pub fn config(&self) -> &PushConfiguration {
        &self.config
    }

    pub fn services(&self) -> &PageServices {
        &self.services
    }

    /// Dedup shared by every delivery path of this page.
    pub fn dedup(&self) -> Arc<DeliveryDedup> {
        Arc::clone(&self.dedup)
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().unwrap().handle.is_some()
    }

    pub fn handler_attached(&self) -> bool {
        self.state.lock().unwrap().handler_attached
    }

    /// Initializes the transport for this page and announces the
    /// configuration to the background worker.
    ///
    /// Returns `false` when the page has to run without push. Failures are
    /// logged, never returned.
    pub async fn initialize(&self) -> bool {
        if self.is_initialized() {
            return true;
        }
        if !ConfigGate::evaluate(&self.config).is_open() {
            return false;
        }

        match self.services.transport.initialize(&self.config) {
            Ok(handle) => {
                LOGGER.debug(format!("Page transport initialized for {}", handle.project_id()));
                self.state.lock().unwrap().handle = Some(handle);
            }
            Err(err) => {
                LOGGER.warn(format!("Push transport initialization failed: {err}"));
                return false;
            }
        }

        self.announce_to_worker().await;
        true
    }

    async fn announce_to_worker(&self) {
        let registration = match self.services.container.ready().await {
            Ok(registration) => registration,
            Err(err) => {
                LOGGER.warn(format!("Service worker never became ready: {err}"));
                return;
            }
        };
        let Some(target) = registration.message_target() else {
            LOGGER.warn("No active service worker to receive the push configuration");
            return;
        };
        let message = WorkerMessage::InitFirebase {
            config: self.config.clone(),
        };
        match self
            .services
            .container
            .post_message(&registration, target, &message)
            .await
        {
            Ok(()) => LOGGER.debug(format!("Sent {} to {target:?} worker", message.type_name())),
            Err(err) => LOGGER.warn(format!("Failed to post {}: {err}", message.type_name())),
        }
    }

    /// Asks for notification permission and returns a delivery token.
    ///
    /// `Ok(None)` covers the expected ways of not getting a token: no
    /// transport, permission not granted, no worker registration or no VAPID
    /// key. Only a failing token request is an error.
    pub async fn request_permission_and_token(&self) -> MessagingResult<Option<String>> {
        let Some(handle) = self.state.lock().unwrap().handle.clone() else {
            LOGGER.debug("Token requested before the transport was initialized");
            return Ok(None);
        };

        let permission = match self.services.permissions.request().await {
            Ok(permission) => permission,
            Err(err) => {
                LOGGER.warn(format!("Permission request failed: {err}"));
                return Ok(None);
            }
        };
        if permission != PermissionState::Granted {
            LOGGER.info(format!("Notification permission is {}", permission.as_str()));
            return Ok(None);
        }

        let Some(registration) = self.worker_registration().await else {
            return Ok(None);
        };
        let Some(vapid_key) = self.config.vapid_key() else {
            LOGGER.warn("No VAPID key configured, cannot request a push token");
            return Ok(None);
        };

        let token = self
            .services
            .transport
            .get_token(&handle, &registration, vapid_key)
            .await?;
        LOGGER.debug("Obtained push token");
        Ok(Some(token))
    }

    async fn worker_registration(&self) -> Option<WorkerRegistration> {
        let container = &self.services.container;
        match container.find_registration(SERVICE_WORKER_PATH).await {
            Ok(Some(registration)) => return Some(registration),
            Ok(None) => {}
            Err(err) => LOGGER.debug(format!("Registration lookup failed: {err}")),
        }
        match container.register(SERVICE_WORKER_PATH).await {
            Ok(registration) => Some(registration),
            Err(err) => {
                LOGGER.error(format!("Service worker registration failed: {err}"));
                None
            }
        }
    }

    /// Subscribes the foreground handler to the transport. Calling it again has
    /// no effect.
    pub fn attach_foreground_handler(self: &Arc<Self>) -> MessagingResult<()> {
        let handle = {
            let mut state = self.state.lock().unwrap();
            let Some(handle) = state.handle.clone() else {
                return Err(not_initialized(
                    "Foreground handler needs an initialized transport",
                ));
            };
            if state.handler_attached {
                return Ok(());
            }
            state.handler_attached = true;
            handle
        };

        let client = Arc::downgrade(self);
        let listener: ForegroundListener = Arc::new(move |payload: InboundPushPayload| {
            let client = client.clone();
            boxed_delivery(async move {
                match client.upgrade() {
                    Some(client) => client.handle_foreground_message(&payload).await,
                    None => Delivery::Ignored,
                }
            })
        });
        if let Err(err) = self.services.transport.on_foreground_message(&handle, listener) {
            self.state.lock().unwrap().handler_attached = false;
            return Err(err);
        }
        Ok(())
    }

    /// Foreground handler: shows a local notification for a message the
    /// transport delivered to this page.
    pub async fn handle_foreground_message(&self, payload: &InboundPushPayload) -> Delivery {
        if !self.handler_attached() {
            return Delivery::Ignored;
        }
        if self.services.permissions.current() != PermissionState::Granted {
            return Delivery::Ignored;
        }

        let (title, body, url) = foreground_fields(payload);
        // Keyed on the normalized text, which is what the relayed `PUSH` copy carries.
        let key = normalize_transport_payload(payload);
        if !self.dedup.first_delivery(&key.title, &key.body) {
            LOGGER.debug(format!("Suppressed duplicate foreground message '{title}'"));
            return Delivery::Duplicate;
        }

        let record = page_record(&title, &body, &url);
        match self.services.notifications.show(&record).await {
            Ok(()) => Delivery::Shown(NotificationPayload {
                title,
                body,
                icon: Some(DEFAULT_ICON.to_string()),
                image: None,
                url,
                raw: payload.data.clone().unwrap_or_default(),
            }),
            Err(err) => {
                LOGGER.warn(format!("Failed to show foreground notification: {err}"));
                Delivery::Failed
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn boxed_delivery<F>(delivery: F) -> DeliveryFuture
where
    F: Future<Output = Delivery> + Send + 'static,
{
    Box::pin(delivery)
}

#[cfg(target_arch = "wasm32")]
fn boxed_delivery<F>(delivery: F) -> DeliveryFuture
where
    F: Future<Output = Delivery> + 'static,
{
    Box::pin(delivery)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::platform::WorkerTarget;
    use crate::test_support::{complete_config, PageFixture};
    use serde_json::json;

    fn inbound(value: serde_json::Value) -> InboundPushPayload {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test(flavor = "current_thread")]
    async fn initialize_posts_config_to_active_worker() {
        let fixture = PageFixture::new(PermissionState::Default);
        fixture.container.set_ready(true, true);
        let client = fixture.client(complete_config());

        assert!(client.initialize().await);
        assert!(client.is_initialized());

        let posted = fixture.container.posted();
        assert_eq!(posted.len(), 1);
        let (target, message) = &posted[0];
        assert_eq!(*target, WorkerTarget::Active);
        assert_eq!(
            message,
            &WorkerMessage::InitFirebase {
                config: complete_config()
            }
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn initialize_falls_back_to_controller() {
        let fixture = PageFixture::new(PermissionState::Default);
        fixture.container.set_ready(false, true);
        let client = fixture.client(complete_config());
        assert!(client.initialize().await);
        assert_eq!(fixture.container.posted()[0].0, WorkerTarget::Controller);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn initialize_without_worker_still_initializes_transport() {
        let fixture = PageFixture::new(PermissionState::Default);
        let client = fixture.client(complete_config());
        assert!(client.initialize().await);
        assert!(fixture.container.posted().is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn incomplete_config_skips_transport() {
        let fixture = PageFixture::new(PermissionState::Granted);
        let mut config = complete_config();
        config.api_key = None;
        let client = Arc::new(fixture.client(config));

        assert!(!client.initialize().await);
        assert_eq!(fixture.transport.initialize_calls(), 0);
        assert_eq!(client.request_permission_and_token().await.unwrap(), None);
        assert_eq!(
            client.attach_foreground_handler().unwrap_err().code_str(),
            "messaging/not-initialized"
        );
        assert_eq!(fixture.transport.foreground_subscriptions(), 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn transport_error_is_logged_not_returned() {
        let fixture = PageFixture::new(PermissionState::Granted);
        fixture.transport.fail_initialize(true);
        let client = fixture.client(complete_config());
        assert!(!client.initialize().await);
        assert!(!client.is_initialized());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn denied_permission_yields_no_token() {
        let fixture = PageFixture::new(PermissionState::Default);
        fixture.permissions.answer_with(PermissionState::Denied);
        let client = fixture.client(complete_config());
        client.initialize().await;

        assert_eq!(client.request_permission_and_token().await.unwrap(), None);
        assert_eq!(fixture.permissions.request_calls(), 1);
        assert_eq!(fixture.transport.token_calls(), 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn granted_permission_registers_worker_and_fetches_token() {
        let fixture = PageFixture::new(PermissionState::Granted);
        let client = fixture.client(complete_config());
        client.initialize().await;

        let token = client.request_permission_and_token().await.unwrap();
        assert_eq!(token.as_deref(), Some("token-1"));
        assert_eq!(fixture.container.registered(), ["/sw.js"]);
        assert_eq!(fixture.transport.last_vapid_key().as_deref(), Some("vapid"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn existing_registration_is_reused() {
        let fixture = PageFixture::new(PermissionState::Granted);
        fixture.container.set_existing_registration(true);
        let client = fixture.client(complete_config());
        client.initialize().await;

        assert!(client.request_permission_and_token().await.unwrap().is_some());
        assert!(fixture.container.registered().is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn registration_failure_yields_no_token() {
        let fixture = PageFixture::new(PermissionState::Granted);
        fixture.container.fail_register(true);
        let client = fixture.client(complete_config());
        client.initialize().await;
        assert_eq!(client.request_permission_and_token().await.unwrap(), None);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn missing_vapid_key_yields_no_token() {
        let fixture = PageFixture::new(PermissionState::Granted);
        let mut config = complete_config();
        config.vapid_key = None;
        let client = fixture.client(config);
        client.initialize().await;
        assert_eq!(client.request_permission_and_token().await.unwrap(), None);
        assert_eq!(fixture.transport.token_calls(), 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn token_failure_is_an_error() {
        let fixture = PageFixture::new(PermissionState::Granted);
        fixture.transport.fail_token(true);
        let client = fixture.client(complete_config());
        client.initialize().await;
        let err = client.request_permission_and_token().await.unwrap_err();
        assert_eq!(err.code_str(), "messaging/token-request-failed");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn foreground_message_shows_local_notification() {
        let fixture = PageFixture::new(PermissionState::Granted);
        let client = Arc::new(fixture.client(complete_config()));
        client.initialize().await;
        client.attach_foreground_handler().unwrap();
        client.attach_foreground_handler().unwrap();
        assert_eq!(fixture.transport.foreground_subscriptions(), 1);

        let payload = inbound(json!({
            "notification": {"title": "A", "body": "B"},
            "data": {"url": "/x"}
        }));
        let deliveries = fixture.transport.deliver_foreground(payload).await;
        assert_eq!(deliveries.len(), 1);
        assert!(deliveries[0].is_shown());
        let shown = fixture.notifications.shown();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].title, "A");
        assert_eq!(shown[0].url(), Some("/x"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn dropped_client_ignores_late_deliveries() {
        let fixture = PageFixture::new(PermissionState::Granted);
        let client = Arc::new(fixture.client(complete_config()));
        client.initialize().await;
        client.attach_foreground_handler().unwrap();
        drop(client);

        let payload = inbound(json!({"notification": {"title": "A"}}));
        let deliveries = fixture.transport.deliver_foreground(payload).await;
        assert_eq!(deliveries, [Delivery::Ignored]);
        assert!(fixture.notifications.shown().is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn foreground_message_needs_handler_and_permission() {
        let fixture = PageFixture::new(PermissionState::Granted);
        let client = Arc::new(fixture.client(complete_config()));
        client.initialize().await;

        let payload = inbound(json!({"notification": {"title": "A"}}));
        assert_eq!(client.handle_foreground_message(&payload).await, Delivery::Ignored);

        client.attach_foreground_handler().unwrap();
        fixture.permissions.set_current(PermissionState::Denied);
        assert_eq!(client.handle_foreground_message(&payload).await, Delivery::Ignored);
        assert!(fixture.notifications.shown().is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn repeated_foreground_message_is_deduplicated() {
        let fixture = PageFixture::new(PermissionState::Granted);
        let client = Arc::new(fixture.client(complete_config()));
        client.initialize().await;
        client.attach_foreground_handler().unwrap();

        let payload = inbound(json!({"notification": {"title": "A", "body": "B"}}));
        assert!(client.handle_foreground_message(&payload).await.is_shown());
        assert_eq!(client.handle_foreground_message(&payload).await, Delivery::Duplicate);
        assert_eq!(fixture.notifications.shown().len(), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn data_message_is_keyed_on_normalized_text() {
        let fixture = PageFixture::new(PermissionState::Granted);
        let client = Arc::new(fixture.client(complete_config()));
        client.initialize().await;
        client.attach_foreground_handler().unwrap();

        let payload = inbound(json!({"data": {"title": "T", "body": "D", "url": "/y"}}));
        let shown = client.handle_foreground_message(&payload).await;
        let Delivery::Shown(shown) = shown else {
            panic!("expected a shown notification, got {shown:?}");
        };
        assert_eq!(shown.title, "Notification");
        assert!(!client.dedup().first_delivery("T", "D"));
    }
}
