//! Web push delivery for the site.
//!
//! Two execution contexts take part and share no memory:
//!
//! * the service worker runs a [`BackgroundWorker`], which initializes the push
//!   transport when a page sends `INIT_FIREBASE`, shows notifications for
//!   incoming pushes, relays a `PUSH` summary to open pages and routes
//!   notification clicks;
//! * each page runs a [`ForegroundMessagingClient`] and a
//!   [`SubscriptionRegistrar`], which drive the permission prompt, fetch a
//!   delivery token and register it with the backend.
//!
//! Both sides talk to the browser only through the traits in [`platform`];
//! the `web` module (feature `wasm-web`, `wasm32` only) implements them with
//! `web-sys`.
//!
//! ```
//! use scrcr_push::messaging::{ConfigGate, PushConfiguration};
//!
//! let config = PushConfiguration::from_lookup(|name| match name {
//!     "VITE_FIREBASE_PROJECT_ID" => Some("demo".to_string()),
//!     _ => None,
//! });
//! assert!(!ConfigGate::evaluate(&config).is_open());
//! ```

pub mod backend;
pub mod config;
pub mod constants;
pub mod dedup;
pub mod error;
pub mod foreground;
mod logger;
pub mod payload;
pub mod platform;
pub mod registrar;
pub mod routing;
mod support;
pub mod types;
#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
pub mod web;
pub mod worker;


pub use backend::BackendClient;
pub use config::{BackendConfig, ConfigGate, PushConfiguration};
pub use dedup::{DedupPolicy, DeliveryDedup, MessageId};
pub use error::{MessagingError, MessagingErrorCode, MessagingResult};
pub use foreground::{ForegroundMessagingClient, PageServices};
pub use registrar::{MountOutcome, PromptView, SubscriptionRegistrar};
pub use routing::ClickRouting;
pub use support::{capabilities, is_supported};
pub use types::{
    Delivery, InboundPushPayload, NotificationPayload, NotificationRecord, PageMessage,
    PermissionState, PushSummary, WorkerMessage,
};
pub use worker::{BackgroundWorker, ClickOutcome, InitOutcome, PushDispatch, WorkerState};
