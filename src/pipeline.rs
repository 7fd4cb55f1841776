use std::sync::Arc;

use reqwest::header::{self, HeaderValue};

use crate::{
    context::CallContext,
    correlation::CorrelationIdInjector,
    credentials::CredentialProvider,
    language::LanguageNegotiator,
    options::CallSettings,
    request::{resolve_url, OutboundRequest},
    response::{parse_retry_after, ServiceResponse},
    retry::AttemptOutcome,
    ConnectorError, Result,
};

/// Decorates, dispatches and retries requests.
///
/// Holds only what is fixed at construction; per-call knobs arrive as a
/// [`CallSettings`] snapshot.
pub(crate) struct Pipeline {
    http: reqwest::Client,
    base_endpoint: String,
    credentials: Arc<dyn CredentialProvider>,
    user_agent: String,
    correlation: CorrelationIdInjector,
    language: LanguageNegotiator,
}

impl Pipeline {
    pub(crate) fn new(
        http: reqwest::Client,
        base_endpoint: String,
        credentials: Arc<dyn CredentialProvider>,
        user_agent: String,
    ) -> Self {
        Self {
            http,
            base_endpoint,
            credentials,
            user_agent,
            correlation: CorrelationIdInjector,
            language: LanguageNegotiator,
        }
    }

    pub(crate) fn base_endpoint(&self) -> &str {
        &self.base_endpoint
    }

    /// Runs one logical call: decorate once, then attempt until the retry
    /// policy stops. The last attempt's error is returned unchanged.
    pub(crate) async fn execute(
        &self,
        settings: &CallSettings,
        mut request: OutboundRequest,
        ctx: &CallContext,
    ) -> Result<ServiceResponse> {
        let correlation_id = self.decorate(settings, &mut request)?;
        let retry_safe = request.is_retry_safe();
        let mut attempts = 0u32;

        // Only read by the tracing events below.
        #[cfg(not(feature = "tracing"))]
        let _ = &correlation_id;

        loop {
            attempts += 1;

            #[cfg(feature = "tracing")]
            tracing::trace!(
                method = %request.method(),
                target = request.target(),
                attempt = attempts,
                correlation_id = correlation_id.as_deref().unwrap_or("-"),
                "dispatching request"
            );

            let err = match ctx.guard(self.dispatch(settings, &request)).await? {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };

            let decision = settings
                .retry_policy
                .decide(attempts, AttemptOutcome::Failure(&err));
            if !retry_safe || !decision.should_retry {
                return Err(err);
            }

            #[cfg(feature = "tracing")]
            tracing::debug!(
                attempt = attempts,
                delay_ms = decision.delay_before_next_attempt.as_millis() as u64,
                error = %err,
                "retrying request"
            );

            ctx.guard(tokio::time::sleep(decision.delay_before_next_attempt))
                .await?;
        }
    }

    fn decorate(
        &self,
        settings: &CallSettings,
        request: &mut OutboundRequest,
    ) -> Result<Option<String>> {
        let headers = request.headers_mut();
        self.credentials.authorize(headers)?;
        let correlation_id = self
            .correlation
            .inject(settings.generate_correlation_id, headers)?;
        self.language.apply(&settings.preferred_language, headers)?;
        let user_agent = HeaderValue::from_str(&self.user_agent).map_err(|err| {
            ConnectorError::InvalidRequest(format!("invalid user agent: {err}"))
        })?;
        headers.insert(header::USER_AGENT, user_agent);
        Ok(correlation_id)
    }

    async fn dispatch(
        &self,
        settings: &CallSettings,
        request: &OutboundRequest,
    ) -> Result<ServiceResponse> {
        let url = resolve_url(&self.base_endpoint, request.target());
        let mut builder = self
            .http
            .request(request.method().clone(), url)
            .headers(request.headers().clone())
            .timeout(settings.request_timeout);
        if let Some(body) = request.body_bytes() {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(ConnectorError::Transport)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(ConnectorError::Transport)?;

        if !status.is_success() {
            return Err(ConnectorError::Http {
                status: status.as_u16(),
                retry_after: parse_retry_after(&headers),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(ServiceResponse {
            status,
            headers,
            body,
        })
    }
}
