//! `botconnector-http` is an async client pipeline for the Bot Connector REST API.
//!
//! Every call made through [`ConnectorClient`] passes through the same steps:
//! - credentials attached by a [`CredentialProvider`]
//! - a per-call `x-ms-client-request-id` correlation id (shared by retries)
//! - `Accept-Language` and `User-Agent` headers
//! - retry of transient failures governed by a pluggable [`RetryPolicy`]
//! - for `202 Accepted` responses, polling with [`LongRunningOperationPoller`]
//!
//! ```no_run
//! use std::sync::Arc;
//! use botconnector_http::{BearerToken, CallContext, ConnectorClient, OutboundRequest};
//!
//! # async fn run() -> botconnector_http::Result<()> {
//! let client = ConnectorClient::new(Arc::new(BearerToken::new("token")));
//! let members = client.conversations().get_conversation_members("conv-1").await?;
//! let outcome = client
//!     .send_long_running(OutboundRequest::post("/v3/jobs"), &CallContext::new())
//!     .await?;
//! # let _ = (members, outcome);
//! # Ok(())
//! # }
//! ```

mod client;
mod context;
mod correlation;
mod credentials;
mod error;
mod language;
mod lro;
mod options;
mod pipeline;
mod request;
mod resources;
mod response;
mod retry;
mod user_agent;
mod wire;

pub use client::ConnectorClient;
pub use context::CallContext;
pub use correlation::{CorrelationId, CorrelationIdInjector, CLIENT_REQUEST_ID_HEADER};
pub use credentials::{
    Anonymous, BearerToken, CredentialError, CredentialProvider, RawAuthorization,
};
pub use error::{ConnectorError, ErrorKind};
pub use language::{LanguageNegotiator, DEFAULT_LANGUAGE};
pub use lro::{
    LongRunning, LongRunningOperationPoller, OperationHandle, OperationState,
    OPERATION_LOCATION_HEADERS,
};
pub use options::{ClientConfiguration, DEFAULT_BASE_ENDPOINT, DEFAULT_LRO_TIMEOUT_SECS};
pub use request::{OutboundRequest, IDEMPOTENCY_KEY_HEADER};
pub use resources::{Attachments, Conversations};
pub use response::ServiceResponse;
pub use retry::{
    is_retryable, AttemptOutcome, ExponentialBackoff, FixedInterval, NoRetry, RetryDecision,
    RetryPolicy,
};
pub use user_agent::{BuildMetadata, CargoBuildMetadata, UserAgentBuilder, FALLBACK_VERSION};
pub use wire::{
    AttachmentInfo, AttachmentView, ChannelAccount, ConversationResourceResponse,
    ResourceResponse,
};

/// Re-exported so callers can cancel calls without naming `tokio-util` themselves.
pub use tokio_util::sync::CancellationToken;

pub type Result<T> = std::result::Result<T, ConnectorError>;
