//! Push configuration and the gate that keeps messaging disabled when it is
//! incomplete.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::messaging::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_BACKEND_TIMEOUT_SECS, ENV_API_BASE_URL, ENV_API_KEY,
    ENV_APP_ID, ENV_AUTH_DOMAIN, ENV_PROJECT_ID, ENV_SENDER_ID, ENV_VAPID_KEY,
};
use crate::messaging::error::{configuration_missing, invalid_argument, MessagingResult};
use crate::messaging::logger::LOGGER;

/// Credentials for the push transport.
///
/// Serialized with the camelCase keys the page posts to the worker in the
/// `INIT_FIREBASE` message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PushConfiguration {
    pub api_key: Option<String>,
    pub auth_domain: Option<String>,
    pub project_id: Option<String>,
    pub messaging_sender_id: Option<String>,
    pub app_id: Option<String>,
    pub vapid_key: Option<String>,
}

impl PushConfiguration {
    /// Values baked in at compile time, the Rust counterpart of bundler
    /// environment injection.
    pub fn from_build_env() -> Self {
        Self {
            api_key: clean(option_env!("VITE_FIREBASE_API_KEY")),
            auth_domain: clean(option_env!("VITE_FIREBASE_AUTH_DOMAIN")),
            project_id: clean(option_env!("VITE_FIREBASE_PROJECT_ID")),
            messaging_sender_id: clean(option_env!("VITE_FIREBASE_SENDER_ID")),
            app_id: clean(option_env!("VITE_FIREBASE_APP_ID")),
            vapid_key: clean(option_env!("VITE_FIREBASE_VAPID_KEY")),
        }
    }

    /// Reads the same variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).and_then(|value| clean(Some(value.as_str())));
        Self {
            api_key: read(ENV_API_KEY),
            auth_domain: read(ENV_AUTH_DOMAIN),
            project_id: read(ENV_PROJECT_ID),
            messaging_sender_id: read(ENV_SENDER_ID),
            app_id: read(ENV_APP_ID),
            vapid_key: read(ENV_VAPID_KEY),
        }
    }

    /// Names (as serialized) of the identity fields that are absent or blank.
    pub fn missing_identity_fields(&self) -> Vec<&'static str> {
        [
            ("apiKey", &self.api_key),
            ("projectId", &self.project_id),
            ("messagingSenderId", &self.messaging_sender_id),
            ("appId", &self.app_id),
        ]
        .into_iter()
        .filter(|(_, value)| !is_present(value))
        .map(|(name, _)| name)
        .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_identity_fields().is_empty()
    }

    pub fn vapid_key(&self) -> Option<&str> {
        self.vapid_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }
}

fn is_present(value: &Option<String>) -> bool {
    value
        .as_deref()
        .map(|value| !value.trim().is_empty())
        .unwrap_or(false)
}

fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Outcome of checking a [`PushConfiguration`] before any transport work.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigGate {
    Open,
    Closed { missing: Vec<&'static str> },
}

impl ConfigGate {
    /// Checks the identity fields. A closed gate is logged once per call.
    pub fn evaluate(config: &PushConfiguration) -> Self {
        let missing = config.missing_identity_fields();
        if missing.is_empty() {
            return ConfigGate::Open;
        }
        LOGGER.warn(format!(
            "Push messaging disabled, configuration is missing: {}",
            missing.join(", ")
        ));
        ConfigGate::Closed { missing }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, ConfigGate::Open)
    }

    pub fn require(&self) -> MessagingResult<()> {
        match self {
            ConfigGate::Open => Ok(()),
            ConfigGate::Closed { missing } => Err(configuration_missing(format!(
                "missing {}",
                missing.join(", ")
            ))),
        }
    }
}

/// Location of the website backend that keeps the device registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendConfig {
    api_base: Url,
    request_timeout: Duration,
}

impl BackendConfig {
    pub fn new(api_base: &str) -> MessagingResult<Self> {
        let api_base = Url::parse(api_base.trim())
            .map_err(|err| invalid_argument(format!("Invalid API base '{api_base}': {err}")))?;
        if api_base.cannot_be_a_base() {
            return Err(invalid_argument(format!(
                "API base '{api_base}' cannot carry a path"
            )));
        }
        Ok(Self {
            api_base,
            request_timeout: Duration::from_secs(DEFAULT_BACKEND_TIMEOUT_SECS),
        })
    }

    /// Reads `VITE_API_BASE_URL` from the process environment, then from the
    /// build environment, falling back to the local development server.
    pub fn from_env() -> MessagingResult<Self> {
        Self::from_lookup(|name| {
            std::env::var(name)
                .ok()
                .or_else(|| option_env!("VITE_API_BASE_URL").map(str::to_string))
        })
    }

    pub fn from_lookup<F>(lookup: F) -> MessagingResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = lookup(ENV_API_BASE_URL)
            .and_then(|value| clean(Some(value.as_str())))
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        Self::new(&base)
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Joins `path` onto the API base, keeping any path prefix the base has.
    pub fn endpoint(&self, path: &str) -> MessagingResult<Url> {
        let mut url = self.api_base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| invalid_argument("API base cannot carry a path"))?;
            segments.pop_if_empty();
            segments.extend(path.split('/').filter(|segment| !segment.is_empty()));
        }
        Ok(url)
    }
}
