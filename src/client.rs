use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::{
    context::CallContext,
    credentials::{BearerToken, CredentialProvider},
    lro::{LongRunning, LongRunningOperationPoller, OperationHandle},
    options::{CallSettings, ClientConfiguration, DEFAULT_BASE_ENDPOINT},
    pipeline::Pipeline,
    request::OutboundRequest,
    resources::{Attachments, Conversations},
    response::ServiceResponse,
    retry::RetryPolicy,
    user_agent::UserAgentBuilder,
    Result,
};

/// Client for the Bot Connector REST API.
///
/// Cloning is cheap; clones share the pipeline and the current settings.
/// Setters affect calls started afterwards, never calls already running.
#[derive(Clone)]
pub struct ConnectorClient {
    inner: Arc<Inner>,
}

struct Inner {
    pipeline: Pipeline,
    poller: LongRunningOperationPoller,
    user_agent: String,
    settings: ArcSwap<CallSettings>,
}

impl fmt::Debug for ConnectorClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorClient")
            .field("base_endpoint", &self.inner.pipeline.base_endpoint())
            .field("credentials", &"<redacted>")
            .field("user_agent", &self.inner.user_agent)
            .field("settings", &self.inner.settings.load_full())
            .finish()
    }
}

impl ConnectorClient {
    /// Creates a client for the public Bot Framework endpoint.
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Self {
        Self::with_base_endpoint(DEFAULT_BASE_ENDPOINT, credentials)
    }

    pub fn with_base_endpoint(
        base_endpoint: impl Into<String>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self::with_configuration(
            ClientConfiguration::new(credentials).with_base_endpoint(base_endpoint),
        )
    }

    /// Creates a client from a fully custom configuration.
    ///
    /// Performs no network I/O.
    pub fn with_configuration(config: ClientConfiguration) -> Self {
        let user_agent = UserAgentBuilder::new(Arc::clone(&config.build_metadata)).build();
        let http = config.http_client.clone().unwrap_or_default();
        let pipeline = Pipeline::new(
            http,
            config.base_endpoint.clone(),
            Arc::clone(&config.credentials),
            user_agent.clone(),
        );

        Self {
            inner: Arc::new(Inner {
                pipeline,
                poller: LongRunningOperationPoller,
                user_agent,
                settings: ArcSwap::from_pointee(config.call_settings()),
            }),
        }
    }

    /// Creates a client from environment variables.
    ///
    /// Reads:
    /// - `BOTCONNECTOR_ENDPOINT`: base endpoint (optional, defaults to
    ///   `https://api.botframework.com`)
    /// - `BOTCONNECTOR_TOKEN`: access token (Bearer prefix optional)
    pub fn from_env() -> std::result::Result<Self, String> {
        let token = std::env::var("BOTCONNECTOR_TOKEN")
            .map_err(|_| "missing BOTCONNECTOR_TOKEN environment variable".to_owned())?;
        if token.trim().is_empty() {
            return Err("BOTCONNECTOR_TOKEN is set but empty".to_owned());
        }
        let endpoint = match std::env::var("BOTCONNECTOR_ENDPOINT") {
            Ok(endpoint) if !endpoint.trim().is_empty() => endpoint,
            _ => DEFAULT_BASE_ENDPOINT.to_owned(),
        };
        Ok(Self::with_base_endpoint(
            endpoint,
            Arc::new(BearerToken::new(token)),
        ))
    }

    pub fn base_endpoint(&self) -> &str {
        self.inner.pipeline.base_endpoint()
    }

    pub fn user_agent(&self) -> &str {
        &self.inner.user_agent
    }

    pub fn accept_language(&self) -> String {
        self.inner.settings.load().preferred_language.clone()
    }

    pub fn set_accept_language(&self, language: impl Into<String>) {
        let language = language.into();
        self.update(|settings| settings.preferred_language = language.clone());
    }

    pub fn retry_policy(&self) -> Arc<dyn RetryPolicy> {
        Arc::clone(&self.inner.settings.load().retry_policy)
    }

    pub fn set_retry_policy(&self, policy: Arc<dyn RetryPolicy>) {
        self.update(|settings| settings.retry_policy = Arc::clone(&policy));
    }

    pub fn long_running_operation_timeout_secs(&self) -> u64 {
        self.inner
            .settings
            .load()
            .long_running_operation_timeout
            .as_secs()
    }

    pub fn set_long_running_operation_timeout_secs(&self, secs: u64) {
        self.update(|settings| {
            settings.long_running_operation_timeout = Duration::from_secs(secs);
        });
    }

    pub fn generate_client_request_id(&self) -> bool {
        self.inner.settings.load().generate_correlation_id
    }

    pub fn set_generate_client_request_id(&self, enabled: bool) {
        self.update(|settings| settings.generate_correlation_id = enabled);
    }

    pub fn conversations(&self) -> Conversations {
        Conversations::new(self.clone())
    }

    pub fn attachments(&self) -> Attachments {
        Attachments::new(self.clone())
    }

    /// Sends a request through the pipeline.
    pub async fn send(&self, request: OutboundRequest) -> Result<ServiceResponse> {
        self.send_with(request, &CallContext::default()).await
    }

    pub async fn send_with(
        &self,
        request: OutboundRequest,
        ctx: &CallContext,
    ) -> Result<ServiceResponse> {
        let settings = self.inner.settings.load_full();
        self.inner.pipeline.execute(&settings, request, ctx).await
    }

    /// Sends a request and decodes the JSON response body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: OutboundRequest) -> Result<T> {
        self.send(request).await?.json()
    }

    /// Sends the initiating request of a possibly long-running operation.
    ///
    /// A 202 response carrying an operation location yields
    /// [`LongRunning::Pending`]; anything else is returned as completed.
    pub async fn begin_long_running(
        &self,
        request: OutboundRequest,
        ctx: &CallContext,
    ) -> Result<LongRunning> {
        let settings = self.inner.settings.load_full();
        self.begin_with(&settings, request, ctx).await
    }

    /// Polls an accepted operation until it succeeds, fails, is canceled,
    /// or the long-running operation timeout elapses.
    pub async fn poll_until_done(
        &self,
        handle: OperationHandle,
        ctx: &CallContext,
    ) -> Result<JsonValue> {
        let settings = self.inner.settings.load_full();
        self.poll_with(&settings, handle, ctx).await
    }

    /// Starts an operation and waits for its final payload.
    pub async fn send_long_running(
        &self,
        request: OutboundRequest,
        ctx: &CallContext,
    ) -> Result<JsonValue> {
        // Both phases run on the snapshot taken here.
        let settings = self.inner.settings.load_full();
        match self.begin_with(&settings, request, ctx).await? {
            LongRunning::Pending(handle) => self.poll_with(&settings, handle, ctx).await,
            LongRunning::Completed(response) if response.body.is_empty() => Ok(JsonValue::Null),
            LongRunning::Completed(response) => response.json(),
        }
    }

    async fn begin_with(
        &self,
        settings: &CallSettings,
        request: OutboundRequest,
        ctx: &CallContext,
    ) -> Result<LongRunning> {
        let response = self.inner.pipeline.execute(settings, request, ctx).await?;
        match OperationHandle::from_accepted(&response, self.base_endpoint()) {
            Some(handle) => Ok(LongRunning::Pending(handle)),
            None => Ok(LongRunning::Completed(response)),
        }
    }

    async fn poll_with(
        &self,
        settings: &CallSettings,
        handle: OperationHandle,
        ctx: &CallContext,
    ) -> Result<JsonValue> {
        self.inner
            .poller
            .poll_until_done(&self.inner.pipeline, settings, handle, ctx)
            .await
    }

    fn update(&self, apply: impl Fn(&mut CallSettings)) {
        self.inner.settings.rcu(|current| {
            let mut next = CallSettings::clone(current);
            apply(&mut next);
            next
        });
    }
}
