//! Tracking of server-side operations that finish after the initiating call.
//!
//! ```text
//! Accepted ──poll (non-terminal)──▶ InProgress ──poll──▶ Succeeded | Failed | Canceled
//!     └───────────────poll (terminal)──────────────────▶
//! ```
//!
//! Polling stops at the first terminal state, when the operation timeout
//! elapses (`OperationTimeout`), or when the caller cancels (`Canceled`).

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value as JsonValue;
use tokio::time::Instant;

use crate::{
    context::CallContext,
    options::CallSettings,
    pipeline::Pipeline,
    request::{resolve_url, OutboundRequest},
    response::ServiceResponse,
    ConnectorError, Result,
};

/// Headers that carry the operation location, in order of preference.
pub const OPERATION_LOCATION_HEADERS: [&str; 3] =
    ["azure-asyncoperation", "operation-location", "location"];

const MIN_DERIVED_INTERVAL: Duration = Duration::from_millis(200);
const MAX_DERIVED_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum OperationState {
    Accepted,
    InProgress,
    Succeeded,
    Failed,
    Canceled,
}

impl OperationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }

    /// Maps a service status string, case-insensitively.
    pub fn parse(status: &str) -> Option<Self> {
        match status.trim().to_ascii_lowercase().as_str() {
            "accepted" | "notstarted" => Some(Self::Accepted),
            "inprogress" | "running" | "updating" => Some(Self::InProgress),
            "succeeded" => Some(Self::Succeeded),
            "failed" => Some(Self::Failed),
            "canceled" | "cancelled" => Some(Self::Canceled),
            _ => None,
        }
    }
}

/// Result of starting a call that may complete asynchronously.
#[derive(Debug)]
pub enum LongRunning {
    /// The service answered directly.
    Completed(ServiceResponse),
    /// The service accepted the request; poll the handle to completion.
    Pending(OperationHandle),
}

/// Per-operation polling state. Owned by exactly one call.
#[derive(Clone, Debug)]
pub struct OperationHandle {
    operation_location: String,
    state: OperationState,
    last_polled_at: Option<Instant>,
    retry_after: Option<Duration>,
    result: Option<JsonValue>,
    error: Option<JsonValue>,
}

impl OperationHandle {
    pub fn new(operation_location: impl Into<String>) -> Self {
        Self {
            operation_location: operation_location.into(),
            state: OperationState::Accepted,
            last_polled_at: None,
            retry_after: None,
            result: None,
            error: None,
        }
    }

    /// Builds a handle from a 202 response, or `None` if it names no operation location.
    pub(crate) fn from_accepted(response: &ServiceResponse, base_endpoint: &str) -> Option<Self> {
        if response.status != StatusCode::ACCEPTED {
            return None;
        }
        let location = OPERATION_LOCATION_HEADERS.iter().find_map(|name| {
            response
                .headers
                .get(*name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        })?;

        let mut handle = Self::new(resolve_url(base_endpoint, location));
        handle.retry_after = response.retry_after();
        Some(handle)
    }

    pub fn operation_location(&self) -> &str {
        &self.operation_location
    }

    pub fn state(&self) -> OperationState {
        self.state
    }

    pub fn last_polled_at(&self) -> Option<Instant> {
        self.last_polled_at
    }

    /// Applies one poll response to the state machine.
    pub(crate) fn observe(&mut self, response: &ServiceResponse) -> Result<()> {
        self.last_polled_at = Some(Instant::now());
        self.retry_after = response.retry_after();

        let document: JsonValue = if response.body.is_empty() {
            JsonValue::Null
        } else {
            response.json()?
        };

        let reported = match document.get("status").and_then(JsonValue::as_str) {
            Some(status) => OperationState::parse(status).ok_or_else(|| {
                ConnectorError::Decode(format!(
                    "unknown operation status '{status}' from {}",
                    self.operation_location
                ))
            })?,
            // Location-style polling: 202 while running, final resource afterwards.
            None if response.status == StatusCode::ACCEPTED => OperationState::InProgress,
            None => {
                self.transition(OperationState::Succeeded)?;
                self.result = Some(document);
                return Ok(());
            }
        };

        self.transition(reported)?;
        match reported {
            OperationState::Succeeded => {
                self.result = Some(
                    document
                        .get("result")
                        .or_else(|| document.get("properties"))
                        .cloned()
                        .unwrap_or(JsonValue::Null),
                );
            }
            OperationState::Failed => {
                self.error = Some(document.get("error").cloned().unwrap_or(JsonValue::Null));
            }
            _ => {}
        }
        Ok(())
    }

    fn transition(&mut self, reported: OperationState) -> Result<()> {
        if self.state.is_terminal() {
            return Err(ConnectorError::Decode(format!(
                "operation at {} already finished as {:?}",
                self.operation_location, self.state
            )));
        }
        let next = if reported.is_terminal() {
            reported
        } else {
            OperationState::InProgress
        };

        #[cfg(feature = "tracing")]
        {
            if next != self.state {
                tracing::debug!(
                    operation = %self.operation_location,
                    from = ?self.state,
                    to = ?next,
                    "long-running operation state changed"
                );
            }
        }

        self.state = next;
        Ok(())
    }

    fn into_outcome(self) -> Result<JsonValue> {
        match self.state {
            OperationState::Succeeded => Ok(self.result.unwrap_or(JsonValue::Null)),
            OperationState::Failed => Err(ConnectorError::OperationFailed {
                operation_location: self.operation_location,
                error: self.error.unwrap_or(JsonValue::Null),
            }),
            OperationState::Canceled => Err(ConnectorError::OperationCanceled {
                operation_location: self.operation_location,
            }),
            state => Err(ConnectorError::Decode(format!(
                "operation at {} is not finished ({state:?})",
                self.operation_location
            ))),
        }
    }
}

/// Drives an [`OperationHandle`] to a terminal state.
///
/// Stateless; one instance serves every call on a client.
#[derive(Clone, Copy, Debug, Default)]
pub struct LongRunningOperationPoller;

impl LongRunningOperationPoller {
    pub(crate) async fn poll_until_done(
        &self,
        pipeline: &Pipeline,
        settings: &CallSettings,
        mut handle: OperationHandle,
        ctx: &CallContext,
    ) -> Result<JsonValue> {
        let started = Instant::now();
        let poll_ctx = ctx.narrowed(started + settings.long_running_operation_timeout);
        let fallback_interval = poll_interval(settings);

        while !handle.state.is_terminal() {
            let wait = handle.retry_after.take().unwrap_or(fallback_interval);
            if let Err(err) = poll_ctx.guard(tokio::time::sleep(wait)).await {
                return Err(interrupted(err, &handle, started));
            }

            let request = OutboundRequest::get(handle.operation_location.clone());
            let response = match pipeline.execute(settings, request, &poll_ctx).await {
                Ok(response) => response,
                Err(err) => return Err(interrupted(err, &handle, started)),
            };
            handle.observe(&response)?;
        }

        handle.into_outcome()
    }
}

/// Interval used when the service does not send `Retry-After`.
pub(crate) fn poll_interval(settings: &CallSettings) -> Duration {
    settings.poll_interval.unwrap_or_else(|| {
        (settings.long_running_operation_timeout / 10)
            .clamp(MIN_DERIVED_INTERVAL, MAX_DERIVED_INTERVAL)
    })
}

fn interrupted(err: ConnectorError, handle: &OperationHandle, started: Instant) -> ConnectorError {
    match err {
        ConnectorError::DeadlineExceeded => ConnectorError::OperationTimeout {
            operation_location: handle.operation_location.clone(),
            waited: started.elapsed(),
            last_state: handle.state,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use bytes::Bytes;
    use reqwest::{
        header::{HeaderMap, HeaderValue},
        StatusCode,
    };
    use serde_json::json;

    use super::{poll_interval, OperationHandle, OperationState};
    use crate::{
        credentials::Anonymous, options::ClientConfiguration, response::ServiceResponse,
        ConnectorError,
    };

    fn response(status: StatusCode, body: serde_json::Value) -> ServiceResponse {
        ServiceResponse {
            status,
            headers: HeaderMap::new(),
            body: Bytes::from(serde_json::to_vec(&body).unwrap()),
        }
    }

    #[test]
    fn parses_status_strings_case_insensitively() {
        assert_eq!(OperationState::parse("InProgress"), Some(OperationState::InProgress));
        assert_eq!(OperationState::parse("SUCCEEDED"), Some(OperationState::Succeeded));
        assert_eq!(OperationState::parse("Cancelled"), Some(OperationState::Canceled));
        assert_eq!(OperationState::parse("NotStarted"), Some(OperationState::Accepted));
        assert_eq!(OperationState::parse("bogus"), None);
    }

    #[test]
    fn accepted_response_yields_handle_with_resolved_location() {
        let mut headers = HeaderMap::new();
        headers.insert("operation-location", HeaderValue::from_static("/operations/7"));
        headers.insert("retry-after", HeaderValue::from_static("2"));
        let accepted = ServiceResponse {
            status: StatusCode::ACCEPTED,
            headers,
            body: Bytes::new(),
        };
        let handle = OperationHandle::from_accepted(&accepted, "https://svc.example.com/")
            .expect("handle must be created");
        assert_eq!(handle.operation_location(), "https://svc.example.com/operations/7");
        assert_eq!(handle.state(), OperationState::Accepted);
        assert_eq!(handle.retry_after, Some(Duration::from_secs(2)));
    }

    #[test]
    fn accepted_without_location_is_not_long_running() {
        let accepted = response(StatusCode::ACCEPTED, json!({}));
        assert!(OperationHandle::from_accepted(&accepted, "https://svc").is_none());
        let ok = response(StatusCode::OK, json!({}));
        assert!(OperationHandle::from_accepted(&ok, "https://svc").is_none());
    }

    #[test]
    fn non_terminal_poll_moves_to_in_progress() {
        let mut handle = OperationHandle::new("https://svc/op");
        handle
            .observe(&response(StatusCode::OK, json!({"status": "Accepted"})))
            .unwrap();
        assert_eq!(handle.state(), OperationState::InProgress);
        assert!(handle.last_polled_at().is_some());
    }

    #[test]
    fn succeeded_poll_carries_result_payload() {
        let mut handle = OperationHandle::new("https://svc/op");
        handle
            .observe(&response(
                StatusCode::OK,
                json!({"status": "Succeeded", "result": {"id": "a1"}}),
            ))
            .unwrap();
        assert_eq!(handle.into_outcome().unwrap(), json!({"id": "a1"}));
    }

    #[test]
    fn failed_poll_surfaces_operation_failed() {
        let mut handle = OperationHandle::new("https://svc/op");
        handle
            .observe(&response(
                StatusCode::OK,
                json!({"status": "Failed", "error": {"code": "Boom"}}),
            ))
            .unwrap();
        match handle.into_outcome() {
            Err(ConnectorError::OperationFailed { error, .. }) => {
                assert_eq!(error, json!({"code": "Boom"}));
            }
            other => panic!("expected OperationFailed, got {other:?}"),
        }
    }

    #[test]
    fn terminal_state_rejects_further_transitions() {
        let mut handle = OperationHandle::new("https://svc/op");
        handle
            .observe(&response(StatusCode::OK, json!({"status": "Canceled"})))
            .unwrap();
        assert!(handle
            .observe(&response(StatusCode::OK, json!({"status": "InProgress"})))
            .is_err());
        assert_eq!(handle.state(), OperationState::Canceled);
    }

    #[test]
    fn location_style_polling_uses_http_status() {
        let mut handle = OperationHandle::new("https://svc/op");
        handle
            .observe(&response(StatusCode::ACCEPTED, json!({})))
            .unwrap();
        assert_eq!(handle.state(), OperationState::InProgress);
        handle
            .observe(&response(StatusCode::OK, json!({"id": "done"})))
            .unwrap();
        assert_eq!(handle.into_outcome().unwrap(), json!({"id": "done"}));
    }

    #[test]
    fn unknown_status_is_a_decode_error() {
        let mut handle = OperationHandle::new("https://svc/op");
        let err = handle
            .observe(&response(StatusCode::OK, json!({"status": "Paused"})))
            .expect_err("unknown status must fail");
        assert!(matches!(err, ConnectorError::Decode(_)));
    }

    #[test]
    fn poll_interval_prefers_configuration_then_derives_from_timeout() {
        let config = ClientConfiguration::new(Arc::new(Anonymous));
        assert_eq!(poll_interval(&config.call_settings()), Duration::from_secs(3));

        let short = config.clone().with_long_running_operation_timeout_secs(1);
        assert_eq!(poll_interval(&short.call_settings()), Duration::from_millis(200));

        let explicit = config.with_poll_interval(Duration::from_millis(25));
        assert_eq!(poll_interval(&explicit.call_settings()), Duration::from_millis(25));
    }
}
