use std::sync::Arc;

use async_trait::async_trait;
use js_sys::Array;
use serde_json::{json, Value};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::convert::FromWasmAbi;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::future_to_promise;

use super::{await_promise, cast, format_js_error, from_js, to_js, WebPushTransport};
use crate::messaging::error::{
    internal_error, network_failure, notification_failed, unsupported_browser, MessagingResult,
};
use crate::messaging::logger::LOGGER;
use crate::messaging::platform::{
    ClickedNotification, ClientDirectory, NotificationCenter, WindowClientInfo,
};
use crate::messaging::types::{NotificationRecord, PageMessage};
use crate::messaging::worker::BackgroundWorker;

fn worker_scope() -> MessagingResult<web_sys::ServiceWorkerGlobalScope> {
    js_sys::global()
        .dyn_into::<web_sys::ServiceWorkerGlobalScope>()
        .map_err(|_| unsupported_browser("Not running inside a service worker"))
}

/// `registration.showNotification` from the worker scope.
#[derive(Clone, Copy, Debug, Default)]
pub struct WorkerNotifications;

#[async_trait(?Send)]
impl NotificationCenter for WorkerNotifications {
    async fn show(&self, record: &NotificationRecord) -> MessagingResult<()> {
        let registration = worker_scope()?.registration();
        let options: web_sys::NotificationOptions = to_js(&record.options)?.unchecked_into();
        await_promise(
            "registration.showNotification",
            registration.show_notification_with_options(&record.title, &options),
            |msg| notification_failed(msg),
        )
        .await
        .map(|_| ())
    }
}

/// `self.clients` of the worker scope.
#[derive(Clone, Copy, Debug, Default)]
pub struct WorkerClients;

impl WorkerClients {
    async fn window_client(&self, client_id: &str) -> MessagingResult<web_sys::WindowClient> {
        let clients = worker_scope()?.clients();
        let value = await_promise("clients.get", Ok(clients.get(client_id)), |msg| {
            internal_error(msg)
        })
        .await?;
        cast(value, "clients.get")
    }
}

#[async_trait(?Send)]
impl ClientDirectory for WorkerClients {
    async fn window_clients(&self) -> MessagingResult<Vec<WindowClientInfo>> {
        let clients = worker_scope()?.clients();
        let options: web_sys::ClientQueryOptions =
            to_js(&json!({"type": "window", "includeUncontrolled": true}))?.unchecked_into();
        let list = await_promise(
            "clients.matchAll",
            Ok(clients.match_all_with_options(&options)),
            |msg| internal_error(msg),
        )
        .await?;
        Ok(Array::from(&list)
            .iter()
            .filter_map(|value| value.dyn_into::<web_sys::WindowClient>().ok())
            .map(|client| WindowClientInfo {
                id: client.id(),
                url: client.url(),
                focused: client.focused(),
            })
            .collect())
    }

    async fn focus(&self, client_id: &str) -> MessagingResult<()> {
        let client = self.window_client(client_id).await?;
        await_promise("WindowClient.focus", client.focus(), |msg| internal_error(msg))
            .await
            .map(|_| ())
    }

    async fn open_window(&self, url: &str) -> MessagingResult<()> {
        let clients = worker_scope()?.clients();
        await_promise("clients.openWindow", Ok(clients.open_window(url)), |msg| {
            network_failure(msg)
        })
        .await
        .map(|_| ())
    }

    async fn post_message(&self, client_id: &str, message: &PageMessage) -> MessagingResult<()> {
        let client = self.window_client(client_id).await?;
        client
            .post_message(&to_js(message)?)
            .map_err(|err| internal_error(format_js_error("Client.postMessage", err)))
    }
}

/// The notification carried by a `notificationclick` event.
pub struct WebClickedNotification {
    notification: web_sys::Notification,
    action: String,
}

impl WebClickedNotification {
    pub fn from_event(event: &web_sys::NotificationEvent) -> Self {
        Self {
            notification: event.notification(),
            action: event.action(),
        }
    }
}

impl ClickedNotification for WebClickedNotification {
    fn action(&self) -> Option<String> {
        Some(self.action.clone()).filter(|action| !action.is_empty())
    }

    fn data(&self) -> Option<Value> {
        from_js(&self.notification.data())
    }

    fn close(&self) {
        self.notification.close();
    }
}

fn listen<E: FromWasmAbi + 'static>(
    scope: &web_sys::ServiceWorkerGlobalScope,
    event_type: &str,
    handler: impl FnMut(E) + 'static,
) -> MessagingResult<()> {
    let closure = Closure::<dyn FnMut(E)>::new(handler);
    scope
        .add_event_listener_with_callback(event_type, closure.as_ref().unchecked_ref())
        .map_err(|err| internal_error(format_js_error("addEventListener", err)))?;
    closure.forget();
    Ok(())
}

fn keep_alive(event: &web_sys::ExtendableEvent, promise: &js_sys::Promise) {
    if let Err(err) = event.wait_until(promise) {
        LOGGER.warn(format_js_error("waitUntil", err));
    }
}

/// Installs the `message`, `push` and `notificationclick` listeners of the
/// service worker script. Call once from the worker's start function.
pub fn install_worker() -> MessagingResult<Arc<BackgroundWorker>> {
    let scope = worker_scope()?;
    let worker = Arc::new(BackgroundWorker::new(
        Arc::new(WebPushTransport::new()),
        Arc::new(WorkerNotifications),
        Arc::new(WorkerClients),
    ));

    {
        let worker = Arc::clone(&worker);
        listen(&scope, "message", move |event: web_sys::ExtendableMessageEvent| {
            if let Some(value) = from_js(&event.data()) {
                worker.handle_raw_message(&value);
            }
        })?;
    }

    {
        let worker = Arc::clone(&worker);
        listen(&scope, "push", move |event: web_sys::PushEvent| {
            let data = event.data().map(|data| data.text().into_bytes());
            let worker = Arc::clone(&worker);
            let promise = future_to_promise(async move {
                worker.on_push(data.as_deref()).await;
                Ok(JsValue::UNDEFINED)
            });
            keep_alive(&event, &promise);
        })?;
    }

    {
        let worker = Arc::clone(&worker);
        listen(&scope, "notificationclick", move |event: web_sys::NotificationEvent| {
            let notification = WebClickedNotification::from_event(&event);
            let worker = Arc::clone(&worker);
            let promise = future_to_promise(async move {
                worker.handle_notification_click(&notification).await;
                Ok(JsValue::UNDEFINED)
            });
            keep_alive(&event, &promise);
        })?;
    }

    LOGGER.debug("Service worker push listeners installed");
    Ok(worker)
}
