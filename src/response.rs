use std::time::{Duration, SystemTime};

use bytes::Bytes;
use reqwest::{
    header::{self, HeaderMap},
    StatusCode,
};
use serde::de::DeserializeOwned;

use crate::{ConnectorError, Result};

/// A fully read response. The body is buffered so the connection is
/// returned to the pool before the pipeline hands control back.
#[derive(Clone, Debug)]
pub struct ServiceResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ServiceResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|err| {
            ConnectorError::Decode(format!(
                "invalid response JSON: {err}; body: {}",
                String::from_utf8_lossy(&self.body)
            ))
        })
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn retry_after(&self) -> Option<Duration> {
        parse_retry_after(&self.headers)
    }
}

/// Parses `Retry-After` as delta-seconds or an HTTP-date.
///
/// Returns `None` when absent, unparseable, or in the past.
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(header::RETRY_AFTER)?.to_str().ok()?;
    let trimmed = value.trim();

    if let Ok(seconds) = trimmed.parse::<i64>() {
        if seconds < 0 {
            return None;
        }
        return Some(Duration::from_secs(seconds as u64));
    }

    let at = httpdate::parse_http_date(trimmed).ok()?;
    at.duration_since(SystemTime::now()).ok()
}
