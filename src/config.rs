use std::time::Duration;

use http::HeaderMap;
use http::header::{HeaderName, HeaderValue};

pub(crate) const DEFAULT_CLIENT_NAME: &str = "reqflow";
pub(crate) const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client-wide settings shared by every `send`.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub client_name: String,
    /// Upper bound for a single dispatch, measured until the response body is read.
    pub request_timeout: Duration,
    /// Fixed delay before a `Retry` restart re-dispatches.
    pub retry_backoff: Duration,
    /// Sent with every request unless an adapter set the same header.
    pub default_headers: HeaderMap,
    pub metrics_enabled: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_name: DEFAULT_CLIENT_NAME.to_owned(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry_backoff: Duration::ZERO,
            default_headers: HeaderMap::new(),
            metrics_enabled: false,
        }
    }
}

impl ClientConfig {
    pub fn with_client_name(mut self, client_name: impl Into<String>) -> Self {
        self.client_name = client_name.into();
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout.max(Duration::from_millis(1));
        self
    }

    pub fn with_retry_backoff(mut self, retry_backoff: Duration) -> Self {
        self.retry_backoff = retry_backoff;
        self
    }

    pub fn with_default_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.default_headers.insert(name, value);
        self
    }

    pub fn with_metrics_enabled(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }
}
