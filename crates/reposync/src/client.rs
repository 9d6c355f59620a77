//! Authenticated JSON client for the repository API.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use serde_json::Value;

use crate::credentials::CredentialStore;
use crate::error::{Result, SyncError};
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpRequest, HttpTransport};
use crate::rate_limit::RequestPacer;
use crate::repo_url::is_safe_url;

pub const DEFAULT_USER_AGENT: &str = concat!("reposync/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(10);
const ACCEPT: &str = "application/vnd.github+json";

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub timeout: StdDuration,
    pub user_agent: String,
    /// Client-side cap on requests per second. `None` disables pacing.
    pub requests_per_second: Option<u32>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            requests_per_second: None,
        }
    }
}

/// Issues authenticated `GET`s and decodes JSON documents.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    credentials: Arc<dyn CredentialStore>,
    user_agent: String,
    pacer: Option<RequestPacer>,
}

impl ApiClient {
    /// Build a client on a reqwest transport.
    ///
    /// # Errors
    ///
    /// [`SyncError::InvalidParameter`] if the HTTP client cannot be built.
    pub fn new(options: &ClientOptions, credentials: Arc<dyn CredentialStore>) -> Result<Self> {
        let transport = ReqwestTransport::with_timeout(options.timeout)
            .map_err(|e| SyncError::invalid_parameter(e.to_string()))?;
        Ok(Self::with_transport(Arc::new(transport), credentials, options))
    }

    pub fn with_transport(
        transport: Arc<dyn HttpTransport>,
        credentials: Arc<dyn CredentialStore>,
        options: &ClientOptions,
    ) -> Self {
        Self {
            transport,
            credentials,
            user_agent: options.user_agent.clone(),
            pacer: options.requests_per_second.map(RequestPacer::new),
        }
    }

    /// The transport this client sends through.
    #[must_use]
    pub fn transport(&self) -> Arc<dyn HttpTransport> {
        Arc::clone(&self.transport)
    }

    async fn wait_for_rate_limit(&self) {
        if let Some(ref pacer) = self.pacer {
            pacer.wait().await;
        }
    }

    fn build_request(&self, url: &str) -> HttpRequest {
        let mut request = HttpRequest::get(url)
            .with_header("Accept", ACCEPT)
            .with_header("User-Agent", self.user_agent.as_str());
        // Missing credentials are not an error: the request goes out anonymously.
        if let Some(auth) = self
            .credentials
            .credentials()
            .and_then(|c| c.basic_auth_header())
        {
            request = request.with_header("Authorization", auth);
        }
        request
    }

    /// `GET` a JSON document.
    ///
    /// Succeeds only for status 200 with a non-empty JSON object or array.
    ///
    /// # Errors
    ///
    /// - [`SyncError::InvalidParameter`] for an empty URL
    /// - [`SyncError::HttpRequestFailed`] for unsafe URLs, transport failures,
    ///   and non-200 responses
    /// - [`SyncError::InvalidJson`] for undecodable or empty bodies
    pub async fn get(&self, url: &str) -> Result<Value> {
        let url = url.trim();
        if url.is_empty() {
            return Err(SyncError::invalid_parameter("request URL is empty"));
        }
        if !is_safe_url(url) {
            return Err(SyncError::http(url, None, "refusing to request unsafe URL"));
        }

        self.wait_for_rate_limit().await;

        let response = self
            .transport
            .send(self.build_request(url))
            .await
            .map_err(|e| SyncError::http(url, None, e.to_string()))?;

        if response.status != 200 {
            let detail = serde_json::from_slice::<Value>(&response.body)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_default();
            let message = if detail.is_empty() {
                format!("HTTP {}", response.status)
            } else {
                format!("HTTP {}: {detail}", response.status)
            };
            return Err(SyncError::http(url, Some(response.status), message));
        }

        let document: Value = serde_json::from_slice(&response.body)
            .map_err(|e| SyncError::invalid_json(url, e.to_string()))?;
        let non_empty = match &document {
            Value::Object(map) => !map.is_empty(),
            Value::Array(items) => !items.is_empty(),
            _ => false,
        };
        if !non_empty {
            return Err(SyncError::invalid_json(
                url,
                "expected a non-empty JSON object or array",
            ));
        }

        tracing::trace!(url, "fetched JSON document");
        Ok(document)
    }
}
