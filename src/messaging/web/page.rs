use std::sync::Arc;

use async_trait::async_trait;
use js_sys::{Array, Reflect};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::spawn_local;

use super::{await_promise, cast, format_js_error, from_js, to_js, WebPushTransport};
use crate::messaging::backend::BackendClient;
use crate::messaging::config::{BackendConfig, PushConfiguration};
use crate::messaging::error::{
    internal_error, notification_failed, permission_denied, unsupported_browser,
    worker_registration_failed, MessagingResult,
};
use crate::messaging::foreground::{ForegroundMessagingClient, PageServices};
use crate::messaging::logger::LOGGER;
use crate::messaging::platform::{
    Capabilities, NotificationCenter, PermissionController, WorkerContainer, WorkerRegistration,
    WorkerTarget,
};
use crate::messaging::registrar::SubscriptionRegistrar;
use crate::messaging::support;
use crate::messaging::types::{NotificationRecord, PermissionState, WorkerMessage};

pub(crate) fn service_worker_container() -> MessagingResult<web_sys::ServiceWorkerContainer> {
    let window = web_sys::window()
        .ok_or_else(|| unsupported_browser("Service workers require a Window context"))?;
    let navigator = JsValue::from(window.navigator());
    let container = Reflect::get(&navigator, &JsValue::from_str("serviceWorker"))
        .map_err(|_| unsupported_browser("Service workers are not available in this browser"))?;
    if container.is_undefined() || container.is_null() {
        return Err(unsupported_browser(
            "Service workers are not available in this browser",
        ));
    }
    cast(container, "navigator.serviceWorker")
}

fn registration_info(
    registration: &web_sys::ServiceWorkerRegistration,
    container: &web_sys::ServiceWorkerContainer,
) -> WorkerRegistration {
    let script_url = registration
        .active()
        .or_else(|| registration.waiting())
        .or_else(|| registration.installing())
        .map(|worker| worker.script_url())
        .unwrap_or_default();
    WorkerRegistration {
        scope: registration.scope(),
        script_url,
        active: registration.active().is_some(),
        controlled: container.controller().is_some(),
    }
}

fn script_matches(script_url: &str, script_path: &str) -> bool {
    url::Url::parse(script_url)
        .map(|url| url.path() == script_path)
        .unwrap_or(false)
}

/// Notifications shown from the page with the `Notification` constructor.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserNotifications;

#[async_trait(?Send)]
impl NotificationCenter for BrowserNotifications {
    async fn show(&self, record: &NotificationRecord) -> MessagingResult<()> {
        let options: web_sys::NotificationOptions = to_js(&record.options)?.unchecked_into();
        web_sys::Notification::new_with_options(&record.title, &options)
            .map(|_| ())
            .map_err(|err| notification_failed(format_js_error("new Notification", err)))
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserPermissions;

#[async_trait(?Send)]
impl PermissionController for BrowserPermissions {
    fn current(&self) -> PermissionState {
        match web_sys::Notification::permission() {
            web_sys::NotificationPermission::Granted => PermissionState::Granted,
            web_sys::NotificationPermission::Denied => PermissionState::Denied,
            _ => PermissionState::Default,
        }
    }

    async fn request(&self) -> MessagingResult<PermissionState> {
        let current = self.current();
        if current != PermissionState::Default {
            return Ok(current);
        }
        let value = await_promise(
            "Notification.requestPermission",
            web_sys::Notification::request_permission(),
            |msg| permission_denied(msg),
        )
        .await?;
        Ok(value
            .as_string()
            .map(|state| PermissionState::from_str_lossy(&state))
            .unwrap_or_else(|| self.current()))
    }
}

/// Page-side `navigator.serviceWorker`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserWorkerContainer;

#[async_trait(?Send)]
impl WorkerContainer for BrowserWorkerContainer {
    fn capabilities(&self) -> Capabilities {
        support::capabilities()
    }

    async fn find_registration(
        &self,
        script_path: &str,
    ) -> MessagingResult<Option<WorkerRegistration>> {
        let container = service_worker_container()?;
        let list = await_promise(
            "serviceWorker.getRegistrations",
            Ok(container.get_registrations()),
            |msg| worker_registration_failed(msg),
        )
        .await?;
        let found = Array::from(&list)
            .iter()
            .filter_map(|value| value.dyn_into::<web_sys::ServiceWorkerRegistration>().ok())
            .map(|registration| registration_info(&registration, &container))
            .find(|info| script_matches(&info.script_url, script_path));
        Ok(found)
    }

    async fn register(&self, script_path: &str) -> MessagingResult<WorkerRegistration> {
        let container = service_worker_container()?;
        let value = await_promise(
            "serviceWorker.register",
            Ok(container.register(script_path)),
            |msg| worker_registration_failed(msg),
        )
        .await?;
        let registration: web_sys::ServiceWorkerRegistration =
            cast(value, "serviceWorker.register")?;
        LOGGER.debug(format!("Registered service worker, scope {}", registration.scope()));
        Ok(registration_info(&registration, &container))
    }

    async fn ready(&self) -> MessagingResult<WorkerRegistration> {
        let container = service_worker_container()?;
        let value = await_promise("serviceWorker.ready", container.ready(), |msg| {
            worker_registration_failed(msg)
        })
        .await?;
        let registration: web_sys::ServiceWorkerRegistration = cast(value, "serviceWorker.ready")?;
        Ok(registration_info(&registration, &container))
    }

    async fn post_message(
        &self,
        registration: &WorkerRegistration,
        target: WorkerTarget,
        message: &WorkerMessage,
    ) -> MessagingResult<()> {
        let container = service_worker_container()?;
        let worker = match target {
            WorkerTarget::Controller => container.controller(),
            WorkerTarget::Active => {
                let value = await_promise(
                    "serviceWorker.getRegistration",
                    Ok(container.get_registration_with_document_url(&registration.scope)),
                    |msg| worker_registration_failed(msg),
                )
                .await?;
                value
                    .dyn_into::<web_sys::ServiceWorkerRegistration>()
                    .ok()
                    .and_then(|registration| registration.active())
            }
        };
        let worker = worker
            .ok_or_else(|| worker_registration_failed(format!("No {target:?} worker to message")))?;
        worker
            .post_message(&to_js(message)?)
            .map_err(|err| internal_error(format_js_error("ServiceWorker.postMessage", err)))
    }
}

/// A mounted page: the registrar plus the listener for worker broadcasts.
pub struct PageSession {
    registrar: Arc<SubscriptionRegistrar>,
    listener: Closure<dyn FnMut(web_sys::MessageEvent)>,
}

impl PageSession {
    pub fn registrar(&self) -> &Arc<SubscriptionRegistrar> {
        &self.registrar
    }

    /// Stops listening for worker broadcasts.
    pub fn unmount(self) {
        self.registrar.unmount();
        if let Ok(container) = service_worker_container() {
            let _ = container.remove_event_listener_with_callback(
                "message",
                self.listener.as_ref().unchecked_ref(),
            );
        }
    }
}

/// Wires the page: initializes the messaging client, mounts the registrar and
/// forwards worker `PUSH` broadcasts to it.
pub fn start_page(config: PushConfiguration, backend: BackendConfig) -> MessagingResult<PageSession> {
    let services = PageServices {
        transport: Arc::new(WebPushTransport::new()),
        container: Arc::new(BrowserWorkerContainer),
        permissions: Arc::new(BrowserPermissions),
        notifications: Arc::new(BrowserNotifications),
    };
    let client = Arc::new(ForegroundMessagingClient::new(config, services));
    let registry = Arc::new(BackendClient::new(&backend)?);
    let registrar = Arc::new(SubscriptionRegistrar::new(Arc::clone(&client), registry));

    let listener = {
        let registrar = Arc::clone(&registrar);
        Closure::<dyn FnMut(web_sys::MessageEvent)>::new(move |event: web_sys::MessageEvent| {
            let Some(value) = from_js(&event.data()) else {
                return;
            };
            let registrar = Arc::clone(&registrar);
            spawn_local(async move {
                registrar.handle_raw_page_message(&value).await;
            });
        })
    };
    if let Ok(container) = service_worker_container() {
        container
            .add_event_listener_with_callback("message", listener.as_ref().unchecked_ref())
            .map_err(|err| internal_error(format_js_error("addEventListener", err)))?;
    }

    spawn_local(async move {
        client.initialize().await;
    });
    {
        let registrar = Arc::clone(&registrar);
        spawn_local(async move {
            registrar.mount().await;
        });
    }

    Ok(PageSession {
        registrar,
        listener,
    })
}
