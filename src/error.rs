use std::time::Duration;

use crate::{credentials::CredentialError, lro::OperationState};

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Non-success HTTP status code with raw response body.
    #[error("http error {status}: {body}")]
    Http {
        status: u16,
        body: String,
        /// Server-suggested delay from the `Retry-After` header, if any.
        retry_after: Option<Duration>,
    },
    /// The credential provider could not attach authentication material.
    #[error("authentication error: {0}")]
    Authentication(#[from] CredentialError),
    /// Response decoding or protocol-shape validation error.
    #[error("decode error: {0}")]
    Decode(String),
    /// The request could not be built (bad header value, bad path).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// A long-running operation reached the `Failed` state.
    #[error("operation at {operation_location} failed: {error}")]
    OperationFailed {
        operation_location: String,
        /// Error payload reported by the server.
        error: serde_json::Value,
    },
    /// The server reported that a long-running operation was canceled.
    #[error("operation at {operation_location} was canceled by the service")]
    OperationCanceled { operation_location: String },
    /// Polling gave up before the operation reached a terminal state.
    #[error("operation at {operation_location} did not complete within {waited:?} (last state: {last_state:?})")]
    OperationTimeout {
        operation_location: String,
        waited: Duration,
        last_state: OperationState,
    },
    /// The caller canceled the call.
    #[error("call canceled by caller")]
    Canceled,
    /// The caller-supplied deadline elapsed before the call completed.
    #[error("call deadline exceeded")]
    DeadlineExceeded,
}

/// Coarse classification of a [`ConnectorError`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    /// Expected to resolve on retry: network failures, 429, 5xx.
    Transient,
    /// Retrying cannot help: other 4xx, malformed responses, bad requests.
    Terminal,
    Authentication,
    OperationFailed,
    OperationCanceled,
    OperationTimeout,
    Canceled,
    DeadlineExceeded,
}

impl ConnectorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(err) => {
                if is_transient_transport(err) {
                    ErrorKind::Transient
                } else {
                    ErrorKind::Terminal
                }
            }
            Self::Http { status, .. } => {
                if is_transient_status(*status) {
                    ErrorKind::Transient
                } else {
                    ErrorKind::Terminal
                }
            }
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::Decode(_) | Self::InvalidRequest(_) => ErrorKind::Terminal,
            Self::OperationFailed { .. } => ErrorKind::OperationFailed,
            Self::OperationCanceled { .. } => ErrorKind::OperationCanceled,
            Self::OperationTimeout { .. } => ErrorKind::OperationTimeout,
            Self::Canceled => ErrorKind::Canceled,
            Self::DeadlineExceeded => ErrorKind::DeadlineExceeded,
        }
    }

    /// Returns `true` when the error is eligible for retry.
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    /// HTTP status of the failed response, if the error carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Transport(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }

    /// Server-suggested retry delay, if the error carries one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Http { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

pub(crate) fn is_transient_status(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}

fn is_transient_transport(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request() || err.is_body()
}
