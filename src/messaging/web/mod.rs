//! `web-sys` implementations of the platform seams, plus the glue that wires
//! them to browser events.
//!
//! [`page`] runs in a window, [`worker`] inside the service worker script.
//! Browser handles are looked up from the global scope on every call so the
//! adapters themselves stay plain unit structs.

mod page;
mod transport;
mod worker;

pub use page::{start_page, BrowserNotifications, BrowserPermissions, BrowserWorkerContainer, PageSession};
pub use transport::WebPushTransport;
pub use worker::{install_worker, WebClickedNotification, WorkerClients, WorkerNotifications};

use serde::Serialize;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use crate::messaging::error::{internal_error, MessagingError, MessagingResult};

pub(crate) fn format_js_error(operation: &str, err: JsValue) -> String {
    let detail = err.as_string().unwrap_or_else(|| format!("{err:?}"));
    format!("{operation} failed: {detail}")
}

/// Converts a serializable value into a plain JS object.
pub(crate) fn to_js<T: Serialize + ?Sized>(value: &T) -> MessagingResult<JsValue> {
    let json = serde_json::to_string(value)
        .map_err(|err| internal_error(format!("Failed to encode value: {err}")))?;
    js_sys::JSON::parse(&json).map_err(|err| internal_error(format_js_error("JSON.parse", err)))
}

/// Reads a structured-clone value (message or notification data) as JSON.
pub(crate) fn from_js(value: &JsValue) -> Option<serde_json::Value> {
    if value.is_undefined() || value.is_null() {
        return None;
    }
    let json: String = js_sys::JSON::stringify(value).ok()?.into();
    serde_json::from_str(&json).ok()
}

pub(crate) async fn await_promise(
    operation: &str,
    promise: Result<js_sys::Promise, JsValue>,
    on_error: fn(String) -> MessagingError,
) -> MessagingResult<JsValue> {
    let promise = promise.map_err(|err| on_error(format_js_error(operation, err)))?;
    JsFuture::from(promise)
        .await
        .map_err(|err| on_error(format_js_error(operation, err)))
}

pub(crate) fn cast<T: JsCast>(value: JsValue, operation: &str) -> MessagingResult<T> {
    value
        .dyn_into::<T>()
        .map_err(|_| internal_error(format!("{operation} returned an unexpected value")))
}
