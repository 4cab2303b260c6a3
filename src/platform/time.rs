#[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[cfg(not(all(target_arch = "wasm32", feature = "wasm-web")))]
use std::time::SystemTime;

/// Wall-clock time that also works inside browsers and service workers,
/// where `SystemTime::now` is unavailable.
#[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
pub fn system_time_now() -> SystemTime {
    let millis = js_sys::Date::now();
    UNIX_EPOCH + Duration::from_millis(millis as u64)
}

#[cfg(not(all(target_arch = "wasm32", feature = "wasm-web")))]
pub fn system_time_now() -> SystemTime {
    SystemTime::now()
}
