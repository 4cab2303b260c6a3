//! Device registry client for the website backend.

use reqwest::{Client, StatusCode, Url};
use serde::Serialize;

use crate::messaging::config::BackendConfig;
use crate::messaging::constants::REGISTER_TOKEN_PATH;
use crate::messaging::error::{internal_error, network_failure, MessagingError, MessagingResult};
use crate::messaging::logger::LOGGER;
use crate::messaging::platform::TokenRegistry;

use async_trait::async_trait;

#[derive(Serialize)]
struct RegisterTokenBody<'a> {
    token: &'a str,
}

/// POSTs delivery tokens to `{api_base}/api/notifications/register`.
#[derive(Clone, Debug)]
pub struct BackendClient {
    http: Client,
    endpoint: Url,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> MessagingResult<Self> {
        let endpoint = config.endpoint(REGISTER_TOKEN_PATH)?;
        let http = build_http_client(config)?;
        Ok(Self { http, endpoint })
    }

    /// Client for the API base found in the environment.
    pub fn from_env() -> MessagingResult<Self> {
        Self::new(&BackendConfig::from_env()?)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub async fn register_token(&self, token: &str) -> MessagingResult<()> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&RegisterTokenBody { token })
            .send()
            .await
            .map_err(|err| network_failure(format!("Token registration request failed: {err}")))?;

        let status = response.status();
        if status.is_success() {
            LOGGER.debug(format!("Backend accepted push token ({status})"));
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }
}

fn status_error(status: StatusCode, body: &str) -> MessagingError {
    let detail = body.trim();
    if detail.is_empty() {
        network_failure(format!("Token registration failed with status {status}"))
    } else {
        network_failure(format!(
            "Token registration failed with status {status}: {detail}"
        ))
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn build_http_client(config: &BackendConfig) -> MessagingResult<Client> {
    Client::builder()
        .user_agent(format!("scrcr-push/{}", env!("CARGO_PKG_VERSION")))
        .timeout(config.request_timeout())
        .build()
        .map_err(|err| internal_error(format!("Failed to build HTTP client: {err}")))
}

// The browser owns timeouts and the user agent for fetch requests.
#[cfg(target_arch = "wasm32")]
fn build_http_client(_config: &BackendConfig) -> MessagingResult<Client> {
    Client::builder()
        .build()
        .map_err(|err| internal_error(format!("Failed to build HTTP client: {err}")))
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl TokenRegistry for BackendClient {
    async fn register(&self, token: &str) -> MessagingResult<()> {
        self.register_token(token).await
    }
}
