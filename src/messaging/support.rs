//! Feature detection for the browser APIs push delivery relies on.
//!
//! Outside a browser page every capability reports `false`.

#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
use js_sys::Reflect;
#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
use wasm_bindgen::{JsCast, JsValue};

use crate::messaging::platform::Capabilities;

/// Returns `true` when the page can register a service worker and subscribe
/// to push.
///
/// # Examples
///
/// ```
/// use scrcr_push::messaging;
///
/// if messaging::is_supported() {
///     // Safe to mount the subscription registrar.
/// }
/// ```
pub fn is_supported() -> bool {
    capabilities().supports_push()
}

#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
pub fn capabilities() -> Capabilities {
    let Some(window) = web_sys::window() else {
        return Capabilities::default();
    };
    let window_js = JsValue::from(window.clone());
    let navigator_js = JsValue::from(window.navigator());

    let service_worker = Reflect::get(&navigator_js, &JsValue::from_str("serviceWorker"))
        .ok()
        .map(|value| !value.is_undefined() && !value.is_null())
        .unwrap_or(false);

    Capabilities {
        service_worker,
        push_manager: property_in(&window_js, "PushManager")
            && prototype_has_property(&window_js, "PushSubscription", "toJSON"),
        notifications: property_in(&window_js, "Notification"),
    }
}

#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
fn property_in(target: &JsValue, property: &str) -> bool {
    Reflect::has(target, &JsValue::from_str(property)).unwrap_or(false)
}

#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
fn prototype_has_property(target: &JsValue, constructor: &str, property: &str) -> bool {
    let Ok(ctor) = Reflect::get(target, &JsValue::from_str(constructor)) else {
        return false;
    };
    let Ok(prototype) = Reflect::get(&ctor, &JsValue::from_str("prototype")) else {
        return false;
    };
    prototype
        .dyn_ref::<js_sys::Object>()
        .map(|obj| obj.has_own_property(&JsValue::from_str(property)))
        .unwrap_or(false)
}

#[cfg(not(all(feature = "wasm-web", target_arch = "wasm32")))]
pub fn capabilities() -> Capabilities {
    Capabilities::default()
}
