use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use js_sys::{Object, Reflect, Uint8Array};
use wasm_bindgen::JsValue;

use super::{await_promise, cast, format_js_error, page::service_worker_container};
use crate::messaging::config::PushConfiguration;
use crate::messaging::error::{
    token_request_failed, transport_init_failed, unsupported_browser, MessagingResult,
};
use crate::messaging::logger::LOGGER;
use crate::messaging::payload::decode_vapid_key;
use crate::messaging::platform::{
    ForegroundListener, PushTransport, TransportHandle, WorkerRegistration,
};

/// Web Push backed transport. The delivery token is the serialized
/// `PushSubscription` (endpoint and keys) the backend needs to send pushes.
#[derive(Debug, Default)]
pub struct WebPushTransport {
    next_id: AtomicU64,
}

impl WebPushTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait(?Send)]
impl PushTransport for WebPushTransport {
    fn initialize(&self, config: &PushConfiguration) -> MessagingResult<TransportHandle> {
        let project_id = config
            .project_id()
            .ok_or_else(|| transport_init_failed("projectId is required"))?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(TransportHandle::new(id, project_id))
    }

    async fn get_token(
        &self,
        handle: &TransportHandle,
        registration: &WorkerRegistration,
        vapid_key: &str,
    ) -> MessagingResult<String> {
        let container = service_worker_container()?;
        let value = await_promise(
            "serviceWorker.getRegistration",
            Ok(container.get_registration_with_document_url(&registration.scope)),
            |msg| token_request_failed(msg),
        )
        .await?;
        if value.is_undefined() {
            return Err(token_request_failed(format!(
                "No service worker registration for scope {}",
                registration.scope
            )));
        }
        let registration: web_sys::ServiceWorkerRegistration =
            cast(value, "serviceWorker.getRegistration")?;
        let push_manager = registration
            .push_manager()
            .map_err(|err| unsupported_browser(format_js_error("pushManager", err)))?;

        let existing = await_promise(
            "pushManager.getSubscription",
            push_manager.get_subscription(),
            |msg| token_request_failed(msg),
        )
        .await?;

        let subscription = if existing.is_undefined() || existing.is_null() {
            let key = decode_vapid_key(vapid_key)?;
            let options = Object::new();
            Reflect::set(&options, &"userVisibleOnly".into(), &JsValue::TRUE)
                .map_err(|err| token_request_failed(format_js_error("subscribe options", err)))?;
            Reflect::set(
                &options,
                &"applicationServerKey".into(),
                &Uint8Array::from(key.as_slice()),
            )
            .map_err(|err| token_request_failed(format_js_error("subscribe options", err)))?;
            let options: web_sys::PushSubscriptionOptionsInit = wasm_bindgen::JsCast::unchecked_into(options);

            let created = await_promise(
                "pushManager.subscribe",
                push_manager.subscribe_with_options(&options),
                |msg| token_request_failed(msg),
            )
            .await?;
            LOGGER.debug(format!("Created push subscription for project {}", handle.project_id()));
            created
        } else {
            existing
        };

        let subscription: web_sys::PushSubscription = cast(subscription, "pushManager.subscribe")?;
        let json = js_sys::JSON::stringify(&subscription)
            .map_err(|err| token_request_failed(format_js_error("PushSubscription.toJSON", err)))?;
        json.as_string()
            .ok_or_else(|| token_request_failed("PushSubscription serialized to a non-string"))
    }

    /// Web Push always wakes the worker, so a page never receives a message
    /// from this transport directly. Open pages get the worker's `PUSH` relay.
    fn on_foreground_message(
        &self,
        handle: &TransportHandle,
        _listener: ForegroundListener,
    ) -> MessagingResult<()> {
        LOGGER.debug(format!(
            "Foreground messages for project {} arrive through the worker relay",
            handle.project_id()
        ));
        Ok(())
    }
}
