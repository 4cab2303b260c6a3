pub const LOGGER_NAME: &str = "@scrcr/push";

/// Script registered as the single service worker for the site. The transport's
/// own default worker script is never registered.
pub const SERVICE_WORKER_PATH: &str = "/sw.js";

pub const REGISTER_TOKEN_PATH: &str = "/api/notifications/register";
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 15;

pub const ENV_API_KEY: &str = "VITE_FIREBASE_API_KEY";
pub const ENV_AUTH_DOMAIN: &str = "VITE_FIREBASE_AUTH_DOMAIN";
pub const ENV_PROJECT_ID: &str = "VITE_FIREBASE_PROJECT_ID";
pub const ENV_SENDER_ID: &str = "VITE_FIREBASE_SENDER_ID";
pub const ENV_APP_ID: &str = "VITE_FIREBASE_APP_ID";
pub const ENV_VAPID_KEY: &str = "VITE_FIREBASE_VAPID_KEY";
pub const ENV_API_BASE_URL: &str = "VITE_API_BASE_URL";

pub const INIT_MESSAGE_TYPE: &str = "INIT_FIREBASE";
pub const PUSH_MESSAGE_TYPE: &str = "PUSH";

pub const DEFAULT_TITLE: &str = "Notification";
pub const DEFAULT_URL: &str = "/";
pub const DEFAULT_ICON: &str = "/icons/icon-192x192.png";
pub const BADGE_ICON: &str = "/icons/badge-72x72.png";

pub const TRANSPORT_VIBRATION: &[u32] = &[200, 100, 200];
pub const LEGACY_VIBRATION: &[u32] = &[100, 50, 100, 50, 100];
pub const LEGACY_TAG: &str = "scrcr-update";

pub const ACTION_VIEW: &str = "view";
pub const ACTION_VIEW_TITLE: &str = "View";
pub const ACTION_DISMISS: &str = "dismiss";
pub const ACTION_DISMISS_TITLE: &str = "Dismiss";

/// Fields the transport adds to every payload it delivers itself.
pub const TRANSPORT_MARKER_FIELDS: &[&str] = &["FCM_MSG", "fcmMessageId"];

pub const PROMPT_ALLOW_LABEL: &str = "Allow";
pub const PROMPT_LATER_LABEL: &str = "Later";

pub const DEFAULT_DEDUP_WINDOW_MS: u64 = 10_000;
