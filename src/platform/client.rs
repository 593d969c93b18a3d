//! Edge platform REST client.
//!
//! This module provides the HTTP transport shared by every resource client:
//! token authentication, status-code mapping and retry of transient failures.

use reqwest::{Client, Method, header};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, trace};

use crate::error::{EdgeDeployError, PlatformError, Result};
use crate::settings::PlatformSettings;

/// Maximum number of attempts for transient failures.
const MAX_RETRIES: u32 = 3;

/// Base delay between retries in milliseconds.
const RETRY_DELAY_MS: u64 = 1000;

/// Which API a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Api {
    /// Resource API (applications, origins, functions, domains, rules).
    Resources,
    /// Storage API (buckets, objects).
    Storage,
}

/// Request body variants.
#[derive(Debug, Clone)]
pub(crate) enum Body {
    /// JSON document.
    Json(serde_json::Value),
    /// Raw bytes with a content type.
    Bytes {
        /// Payload.
        data: Vec<u8>,
        /// MIME type.
        content_type: String,
    },
}

/// Response envelope; the resource API wraps payloads in `results`, the
/// storage API in `data`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(alias = "data")]
    results: T,
}

/// Edge platform API client.
#[derive(Debug, Clone)]
pub struct PlatformClient {
    /// HTTP client.
    client: Client,
    /// API token.
    token: String,
    /// Resource API base URL, without trailing slash.
    api_url: String,
    /// Storage API base URL, without trailing slash.
    storage_url: String,
    /// Base delay between retries.
    retry_delay: Duration,
}

impl PlatformClient {
    /// Creates a client from connection settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(settings: &PlatformSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(concat!("edge-deploy/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PlatformError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            token: settings.token.clone(),
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            storage_url: settings.storage_url.trim_end_matches('/').to_string(),
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
        })
    }

    /// Sets the base delay between retries.
    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Builds an absolute URL for a path on one of the APIs.
    fn url(&self, api: Api, path: &str) -> String {
        let base = match api {
            Api::Resources => &self.api_url,
            Api::Storage => &self.storage_url,
        };
        format!("{base}/{}", path.trim_start_matches('/'))
    }

    /// Sends a request and decodes the enveloped payload.
    pub(crate) async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        api: Api,
        path: &str,
        body: Option<Body>,
    ) -> Result<T> {
        let text = self.execute(method, api, path, body).await?;

        let envelope: Envelope<T> = serde_json::from_str(&text).map_err(|e| {
            PlatformError::invalid_response(format!("Failed to parse response from {path}: {e}"))
        })?;

        Ok(envelope.results)
    }

    /// Sends a request whose response body is irrelevant.
    pub(crate) async fn send_unit(
        &self,
        method: Method,
        api: Api,
        path: &str,
        body: Option<Body>,
    ) -> Result<()> {
        self.execute(method, api, path, body).await.map(|_| ())
    }

    /// Executes a request, retrying transient failures.
    async fn execute(
        &self,
        method: Method,
        api: Api,
        path: &str,
        body: Option<Body>,
    ) -> Result<String> {
        let url = self.url(api, path);
        let mut last_error: Option<EdgeDeployError> = None;

        for attempt in 0..MAX_RETRIES {
            if let Some(e) = &last_error {
                // Retry-After from the platform wins over local backoff.
                let delay = e
                    .retry_delay_secs()
                    .map_or(self.retry_delay * attempt, Duration::from_secs);
                debug!("Retry attempt {attempt} of {MAX_RETRIES} for {method} {url} in {delay:?}");
                tokio::time::sleep(delay).await;
            }

            match self.execute_once(method.clone(), &url, body.as_ref()).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    if e.is_retryable() {
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            EdgeDeployError::Platform(PlatformError::network("Max retries exceeded"))
        }))
    }

    /// Executes a single HTTP request.
    async fn execute_once(&self, method: Method, url: &str, body: Option<&Body>) -> Result<String> {
        trace!("{method} {url}");

        let mut request = self
            .client
            .request(method, url)
            .header(header::ACCEPT, "application/json; version=3")
            .header(header::AUTHORIZATION, format!("Token {}", self.token));

        request = match body {
            Some(Body::Json(json)) => {
                trace!("Request body: {json}");
                request.json(json)
            }
            Some(Body::Bytes { data, content_type }) => request
                .header(header::CONTENT_TYPE, content_type.as_str())
                .body(data.clone()),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| PlatformError::network(format!("Request failed: {e}")))?;

        let status = response.status();

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or_default();
            let retry_after = if retry_after == 0 { 60 } else { retry_after };

            return Err(EdgeDeployError::Platform(PlatformError::RateLimited {
                retry_after_secs: retry_after,
            }));
        }

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(EdgeDeployError::Platform(
                PlatformError::AuthenticationFailed {
                    message: String::from("Invalid or expired API token"),
                },
            ));
        }

        let text = response.text().await.unwrap_or_default();

        if status.is_server_error() {
            return Err(EdgeDeployError::Platform(PlatformError::network(format!(
                "Server error {}: {text}",
                status.as_u16()
            ))));
        }

        if !status.is_success() {
            return Err(EdgeDeployError::Platform(PlatformError::api_error(
                status.as_u16(),
                text,
            )));
        }

        trace!("Response body: {text}");
        Ok(text)
    }
}
