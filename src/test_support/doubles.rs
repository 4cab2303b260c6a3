//! In-memory stand-ins for the browser seams.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::messaging::config::PushConfiguration;
use crate::messaging::error::{
    network_failure, notification_failed, token_request_failed, transport_init_failed,
    worker_registration_failed, MessagingResult,
};
use crate::messaging::platform::{
    Capabilities, ClickedNotification, ClientDirectory, ForegroundListener, NotificationCenter,
    PermissionController, PushTransport, TokenRegistry, TransportHandle, WindowClientInfo,
    WorkerContainer, WorkerRegistration, WorkerTarget,
};
use crate::messaging::types::{
    Delivery, InboundPushPayload, NotificationRecord, PageMessage, PermissionState, WorkerMessage,
};

#[derive(Default)]
pub struct StubTransport {
    initialize_calls: AtomicUsize,
    token_calls: AtomicUsize,
    next_handle: AtomicU64,
    fail_initialize: AtomicBool,
    fail_token: AtomicBool,
    last_vapid_key: Mutex<Option<String>>,
    foreground_listeners: Mutex<Vec<ForegroundListener>>,
}

impl StubTransport {
    pub fn foreground_subscriptions(&self) -> usize {
        self.foreground_listeners.lock().unwrap().len()
    }

    /// Hands `payload` to every subscribed foreground listener, the way the
    /// transport delivers to a visible page.
    pub async fn deliver_foreground(&self, payload: InboundPushPayload) -> Vec<Delivery> {
        let listeners = self.foreground_listeners.lock().unwrap().clone();
        let mut deliveries = Vec::with_capacity(listeners.len());
        for listener in listeners {
            deliveries.push(listener(payload.clone()).await);
        }
        deliveries
    }

    pub fn initialize_calls(&self) -> usize {
        self.initialize_calls.load(Ordering::SeqCst)
    }

    pub fn token_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }

    pub fn fail_initialize(&self, fail: bool) {
        self.fail_initialize.store(fail, Ordering::SeqCst);
    }

    pub fn fail_token(&self, fail: bool) {
        self.fail_token.store(fail, Ordering::SeqCst);
    }

    pub fn last_vapid_key(&self) -> Option<String> {
        self.last_vapid_key.lock().unwrap().clone()
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl PushTransport for StubTransport {
    fn initialize(&self, config: &PushConfiguration) -> MessagingResult<TransportHandle> {
        self.initialize_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_initialize.load(Ordering::SeqCst) {
            return Err(transport_init_failed("stub transport refused the config"));
        }
        let id = self.next_handle.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(TransportHandle::new(id, config.project_id().unwrap_or_default()))
    }

    async fn get_token(
        &self,
        _handle: &TransportHandle,
        _registration: &WorkerRegistration,
        vapid_key: &str,
    ) -> MessagingResult<String> {
        let call = self.token_calls.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_vapid_key.lock().unwrap() = Some(vapid_key.to_string());
        if self.fail_token.load(Ordering::SeqCst) {
            return Err(token_request_failed("stub transport has no token"));
        }
        Ok(format!("token-{call}"))
    }

    fn on_foreground_message(
        &self,
        _handle: &TransportHandle,
        listener: ForegroundListener,
    ) -> MessagingResult<()> {
        self.foreground_listeners.lock().unwrap().push(listener);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifications {
    shown: Mutex<Vec<NotificationRecord>>,
    fail_next: AtomicBool,
}

impl RecordingNotifications {
    pub fn shown(&self) -> Vec<NotificationRecord> {
        self.shown.lock().unwrap().clone()
    }

    pub fn fail_next_show(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl NotificationCenter for RecordingNotifications {
    async fn show(&self, record: &NotificationRecord) -> MessagingResult<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(notification_failed("notification center unavailable"));
        }
        self.shown.lock().unwrap().push(record.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingClients {
    clients: Mutex<Vec<WindowClientInfo>>,
    failing: Mutex<HashSet<String>>,
    posted: Mutex<Vec<(String, PageMessage)>>,
    focused: Mutex<Vec<String>>,
    opened: Mutex<Vec<String>>,
}

impl RecordingClients {
    pub fn add_client(&self, id: &str, url: &str, focused: bool) {
        self.clients.lock().unwrap().push(WindowClientInfo {
            id: id.to_string(),
            url: url.to_string(),
            focused,
        });
    }

    pub fn fail_post_to(&self, id: &str) {
        self.failing.lock().unwrap().insert(id.to_string());
    }

    pub fn posted(&self) -> Vec<(String, PageMessage)> {
        self.posted.lock().unwrap().clone()
    }

    pub fn focused(&self) -> Vec<String> {
        self.focused.lock().unwrap().clone()
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl ClientDirectory for RecordingClients {
    async fn window_clients(&self) -> MessagingResult<Vec<WindowClientInfo>> {
        Ok(self.clients.lock().unwrap().clone())
    }

    async fn focus(&self, client_id: &str) -> MessagingResult<()> {
        self.focused.lock().unwrap().push(client_id.to_string());
        Ok(())
    }

    async fn open_window(&self, url: &str) -> MessagingResult<()> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn post_message(&self, client_id: &str, message: &PageMessage) -> MessagingResult<()> {
        if self.failing.lock().unwrap().contains(client_id) {
            return Err(network_failure(format!("client {client_id} is gone")));
        }
        self.posted
            .lock()
            .unwrap()
            .push((client_id.to_string(), message.clone()));
        Ok(())
    }
}

pub struct StubClick {
    action: Option<String>,
    data: Value,
    closed: AtomicBool,
}

impl StubClick {
    pub fn new(action: Option<&str>, data: Value) -> Self {
        Self {
            action: action.map(str::to_string),
            data,
            closed: AtomicBool::new(false),
        }
    }

    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl ClickedNotification for StubClick {
    fn action(&self) -> Option<String> {
        self.action.clone()
    }

    fn data(&self) -> Option<Value> {
        Some(self.data.clone()).filter(|data| !data.is_null())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// `navigator.serviceWorker` double. Push is supported and `ready` resolves
/// to a registration without an active worker unless configured otherwise.
pub struct FakeContainer {
    capabilities: Mutex<Capabilities>,
    existing: AtomicBool,
    fail_register: AtomicBool,
    ready_flags: Mutex<(bool, bool)>,
    registered: Mutex<Vec<String>>,
    posted: Mutex<Vec<(WorkerTarget, WorkerMessage)>>,
}

impl Default for FakeContainer {
    fn default() -> Self {
        Self {
            capabilities: Mutex::new(Capabilities {
                service_worker: true,
                push_manager: true,
                notifications: true,
            }),
            existing: AtomicBool::new(false),
            fail_register: AtomicBool::new(false),
            ready_flags: Mutex::new((false, false)),
            registered: Mutex::new(Vec::new()),
            posted: Mutex::new(Vec::new()),
        }
    }
}

impl FakeContainer {
    pub fn set_push_support(&self, supported: bool) {
        let mut caps = self.capabilities.lock().unwrap();
        caps.service_worker = supported;
        caps.push_manager = supported;
    }

    pub fn set_ready(&self, active: bool, controlled: bool) {
        *self.ready_flags.lock().unwrap() = (active, controlled);
    }

    pub fn set_existing_registration(&self, existing: bool) {
        self.existing.store(existing, Ordering::SeqCst);
    }

    pub fn fail_register(&self, fail: bool) {
        self.fail_register.store(fail, Ordering::SeqCst);
    }

    pub fn registered(&self) -> Vec<String> {
        self.registered.lock().unwrap().clone()
    }

    pub fn posted(&self) -> Vec<(WorkerTarget, WorkerMessage)> {
        self.posted.lock().unwrap().clone()
    }

    fn registration(&self, script_path: &str) -> WorkerRegistration {
        let (active, controlled) = *self.ready_flags.lock().unwrap();
        WorkerRegistration {
            scope: "https://site/".to_string(),
            script_url: format!("https://site{script_path}"),
            active,
            controlled,
        }
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl WorkerContainer for FakeContainer {
    fn capabilities(&self) -> Capabilities {
        *self.capabilities.lock().unwrap()
    }

    async fn find_registration(
        &self,
        script_path: &str,
    ) -> MessagingResult<Option<WorkerRegistration>> {
        if self.existing.load(Ordering::SeqCst) {
            Ok(Some(self.registration(script_path)))
        } else {
            Ok(None)
        }
    }

    async fn register(&self, script_path: &str) -> MessagingResult<WorkerRegistration> {
        if self.fail_register.load(Ordering::SeqCst) {
            return Err(worker_registration_failed("script failed to install"));
        }
        self.registered.lock().unwrap().push(script_path.to_string());
        Ok(self.registration(script_path))
    }

    async fn ready(&self) -> MessagingResult<WorkerRegistration> {
        Ok(self.registration("/sw.js"))
    }

    async fn post_message(
        &self,
        _registration: &WorkerRegistration,
        target: WorkerTarget,
        message: &WorkerMessage,
    ) -> MessagingResult<()> {
        self.posted.lock().unwrap().push((target, message.clone()));
        Ok(())
    }
}

pub struct FakePermissions {
    current: Mutex<PermissionState>,
    answer: Mutex<Option<PermissionState>>,
    request_calls: AtomicUsize,
}

impl FakePermissions {
    pub fn new(current: PermissionState) -> Self {
        Self {
            current: Mutex::new(current),
            answer: Mutex::new(None),
            request_calls: AtomicUsize::new(0),
        }
    }

    /// What the user picks when the browser prompts.
    pub fn answer_with(&self, state: PermissionState) {
        *self.answer.lock().unwrap() = Some(state);
    }

    pub fn set_current(&self, state: PermissionState) {
        *self.current.lock().unwrap() = state;
    }

    pub fn current_state(&self) -> PermissionState {
        *self.current.lock().unwrap()
    }

    pub fn request_calls(&self) -> usize {
        self.request_calls.load(Ordering::SeqCst)
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl PermissionController for FakePermissions {
    fn current(&self) -> PermissionState {
        self.current_state()
    }

    async fn request(&self) -> MessagingResult<PermissionState> {
        self.request_calls.fetch_add(1, Ordering::SeqCst);
        let mut current = self.current.lock().unwrap();
        if *current == PermissionState::Default {
            if let Some(answer) = *self.answer.lock().unwrap() {
                *current = answer;
            }
        }
        Ok(*current)
    }
}

#[derive(Default)]
pub struct RecordingRegistry {
    tokens: Mutex<Vec<String>>,
    attempts: AtomicUsize,
    fail: AtomicBool,
}

impl RecordingRegistry {
    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl TokenRegistry for RecordingRegistry {
    async fn register(&self, token: &str) -> MessagingResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(network_failure("backend returned 503"));
        }
        self.tokens.lock().unwrap().push(token.to_string());
        Ok(())
    }
}
