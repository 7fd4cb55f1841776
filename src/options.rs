use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    credentials::CredentialProvider,
    language::DEFAULT_LANGUAGE,
    retry::{ExponentialBackoff, RetryPolicy},
    user_agent::{BuildMetadata, CargoBuildMetadata},
};

/// Endpoint used when no base endpoint is configured.
pub const DEFAULT_BASE_ENDPOINT: &str = "https://api.botframework.com";
/// Default long-running operation timeout in seconds.
pub const DEFAULT_LRO_TIMEOUT_SECS: u64 = 30;

/// Everything a [`ConnectorClient`](crate::ConnectorClient) is built from.
#[derive(Clone)]
pub struct ClientConfiguration {
    pub base_endpoint: String,
    pub credentials: Arc<dyn CredentialProvider>,
    /// Sent as `Accept-Language`.
    pub preferred_language: String,
    /// Attach a fresh `x-ms-client-request-id` to each call.
    pub generate_correlation_id: bool,
    /// Upper bound on polling a long-running operation.
    pub long_running_operation_timeout_secs: u64,
    /// Poll interval used when the service sends no `Retry-After`.
    /// `None` derives one from the timeout.
    pub long_running_operation_poll_interval: Option<Duration>,
    /// Per-attempt HTTP timeout in milliseconds.
    pub request_timeout_ms: u64,
    pub retry_policy: Arc<dyn RetryPolicy>,
    /// Pre-built transport, e.g. with a proxy configured.
    pub http_client: Option<reqwest::Client>,
    /// Source of the version strings in the user agent.
    pub build_metadata: Arc<dyn BuildMetadata>,
}

impl fmt::Debug for ClientConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfiguration")
            .field("base_endpoint", &self.base_endpoint)
            .field("credentials", &"<redacted>")
            .field("preferred_language", &self.preferred_language)
            .field("generate_correlation_id", &self.generate_correlation_id)
            .field(
                "long_running_operation_timeout_secs",
                &self.long_running_operation_timeout_secs,
            )
            .field(
                "long_running_operation_poll_interval",
                &self.long_running_operation_poll_interval,
            )
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("retry_policy", &self.retry_policy)
            .field("http_client", &self.http_client.is_some())
            .finish()
    }
}

impl ClientConfiguration {
    /// Defaults for everything except the credentials.
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            base_endpoint: DEFAULT_BASE_ENDPOINT.to_owned(),
            credentials,
            preferred_language: DEFAULT_LANGUAGE.to_owned(),
            generate_correlation_id: true,
            long_running_operation_timeout_secs: DEFAULT_LRO_TIMEOUT_SECS,
            long_running_operation_poll_interval: None,
            request_timeout_ms: 10_000,
            retry_policy: Arc::new(ExponentialBackoff::default()),
            http_client: None,
            build_metadata: Arc::new(CargoBuildMetadata),
        }
    }

    pub fn with_base_endpoint(mut self, base_endpoint: impl Into<String>) -> Self {
        self.base_endpoint = base_endpoint.into();
        self
    }

    pub fn with_preferred_language(mut self, language: impl Into<String>) -> Self {
        self.preferred_language = language.into();
        self
    }

    pub fn with_correlation_id(mut self, enabled: bool) -> Self {
        self.generate_correlation_id = enabled;
        self
    }

    pub fn with_long_running_operation_timeout_secs(mut self, secs: u64) -> Self {
        self.long_running_operation_timeout_secs = secs;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.long_running_operation_poll_interval = Some(interval);
        self
    }

    pub fn with_request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }

    pub fn with_retry_policy(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.retry_policy = Arc::new(policy);
        self
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn with_build_metadata(mut self, metadata: impl BuildMetadata + 'static) -> Self {
        self.build_metadata = Arc::new(metadata);
        self
    }

    pub(crate) fn call_settings(&self) -> CallSettings {
        CallSettings {
            preferred_language: self.preferred_language.clone(),
            generate_correlation_id: self.generate_correlation_id,
            long_running_operation_timeout: Duration::from_secs(
                self.long_running_operation_timeout_secs,
            ),
            poll_interval: self.long_running_operation_poll_interval,
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            retry_policy: Arc::clone(&self.retry_policy),
        }
    }
}

/// Settings a call reads once at its start. Setters publish a new
/// snapshot; calls already running keep the one they loaded.
#[derive(Clone, Debug)]
pub(crate) struct CallSettings {
    pub preferred_language: String,
    pub generate_correlation_id: bool,
    pub long_running_operation_timeout: Duration,
    pub poll_interval: Option<Duration>,
    pub request_timeout: Duration,
    pub retry_policy: Arc<dyn RetryPolicy>,
}
