//! Seams between the delivery pipeline and the host environment.
//!
//! The worker and page state machines only talk to the browser through these
//! traits. The `web` module implements them with `web-sys`; tests use the
//! in-memory doubles from `test_support`.

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(not(target_arch = "wasm32"))]
use futures::future::BoxFuture;
#[cfg(target_arch = "wasm32")]
use futures::future::LocalBoxFuture;
use serde_json::Value;

use crate::messaging::config::PushConfiguration;
use crate::messaging::error::MessagingResult;
use crate::messaging::types::{
    Delivery, InboundPushPayload, NotificationRecord, PageMessage, PermissionState,
    WorkerMessage,
};

#[cfg(not(target_arch = "wasm32"))]
pub type DeliveryFuture = BoxFuture<'static, Delivery>;
#[cfg(target_arch = "wasm32")]
pub type DeliveryFuture = LocalBoxFuture<'static, Delivery>;

/// Callback a transport invokes for every message it delivers to a visible
/// page.
pub type ForegroundListener = Arc<dyn Fn(InboundPushPayload) -> DeliveryFuture + Send + Sync>;

/// OS notification center as seen from the current execution context.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait NotificationCenter: Send + Sync {
    async fn show(&self, record: &NotificationRecord) -> MessagingResult<()>;
}

/// Page-side access to the notification permission.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait PermissionController: Send + Sync {
    fn current(&self) -> PermissionState;

    /// Prompts when the state is still `Default`; resolves to the new state.
    async fn request(&self) -> MessagingResult<PermissionState>;
}

/// Browser features the page needs before it touches push at all.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub service_worker: bool,
    pub push_manager: bool,
    pub notifications: bool,
}

impl Capabilities {
    pub fn supports_push(&self) -> bool {
        self.service_worker && self.push_manager
    }
}

/// A service worker registration, identified by its scope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerRegistration {
    pub scope: String,
    pub script_url: String,
    /// The registration has an active worker.
    pub active: bool,
    /// The page is controlled by a worker.
    pub controlled: bool,
}

/// Recipient of a page to worker message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerTarget {
    Active,
    Controller,
}

impl WorkerRegistration {
    /// Active worker first, the page's controller as fallback.
    pub fn message_target(&self) -> Option<WorkerTarget> {
        if self.active {
            Some(WorkerTarget::Active)
        } else if self.controlled {
            Some(WorkerTarget::Controller)
        } else {
            None
        }
    }
}

/// Page-side view of `navigator.serviceWorker`.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait WorkerContainer: Send + Sync {
    fn capabilities(&self) -> Capabilities;

    /// Existing registration whose worker script is `script_path`.
    async fn find_registration(&self, script_path: &str)
        -> MessagingResult<Option<WorkerRegistration>>;

    async fn register(&self, script_path: &str) -> MessagingResult<WorkerRegistration>;

    /// Resolves once a registration with an active worker exists.
    async fn ready(&self) -> MessagingResult<WorkerRegistration>;

    async fn post_message(
        &self,
        registration: &WorkerRegistration,
        target: WorkerTarget,
        message: &WorkerMessage,
    ) -> MessagingResult<()>;
}

/// A window client as enumerated by the worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WindowClientInfo {
    pub id: String,
    pub url: String,
    pub focused: bool,
}

/// Worker-side view of `self.clients`. Enumeration includes uncontrolled
/// windows.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait ClientDirectory: Send + Sync {
    async fn window_clients(&self) -> MessagingResult<Vec<WindowClientInfo>>;

    async fn focus(&self, client_id: &str) -> MessagingResult<()>;

    async fn open_window(&self, url: &str) -> MessagingResult<()>;

    async fn post_message(&self, client_id: &str, message: &PageMessage) -> MessagingResult<()>;
}

/// The notification a `notificationclick` event refers to.
pub trait ClickedNotification {
    /// The action button that was clicked, `None` for the notification body.
    fn action(&self) -> Option<String>;

    fn data(&self) -> Option<Value>;

    fn close(&self);
}

/// Opaque handle returned by a successful transport initialization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportHandle {
    id: u64,
    project_id: String,
}

impl TransportHandle {
    pub fn new(id: u64, project_id: impl Into<String>) -> Self {
        Self {
            id,
            project_id: project_id.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }
}

/// Third-party push transport. Its internals are not modelled; the pipeline
/// only initializes it and asks it for a delivery token.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait PushTransport: Send + Sync {
    /// Called only with a configuration whose identity fields are present.
    fn initialize(&self, config: &PushConfiguration) -> MessagingResult<TransportHandle>;

    async fn get_token(
        &self,
        handle: &TransportHandle,
        registration: &WorkerRegistration,
        vapid_key: &str,
    ) -> MessagingResult<String>;

    /// Subscribes `listener` to foreground deliveries. Transports that only
    /// deliver to the worker keep this default and drop the listener.
    fn on_foreground_message(
        &self,
        handle: &TransportHandle,
        listener: ForegroundListener,
    ) -> MessagingResult<()> {
        let _ = (handle, listener);
        Ok(())
    }
}

/// Backend device registry.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait TokenRegistry: Send + Sync {
    async fn register(&self, token: &str) -> MessagingResult<()>;
}
