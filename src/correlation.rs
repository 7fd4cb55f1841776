use std::fmt;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::{ConnectorError, Result};

/// Header carrying the per-call correlation id.
pub const CLIENT_REQUEST_ID_HEADER: &str = "x-ms-client-request-id";

/// Opaque per-call identifier, backed by a random (v4) UUID.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stamps a correlation id onto a request before its first dispatch.
///
/// The injector is stateless; the id it attaches lives in the request
/// headers, so every retry of that request reuses it.
#[derive(Clone, Copy, Debug, Default)]
pub struct CorrelationIdInjector;

impl CorrelationIdInjector {
    /// Attaches a fresh id when `enabled` and the caller did not set one.
    ///
    /// Returns the id now present on the request, if any.
    pub fn inject(&self, enabled: bool, headers: &mut HeaderMap) -> Result<Option<String>> {
        if !enabled {
            return Ok(None);
        }
        let name = HeaderName::from_static(CLIENT_REQUEST_ID_HEADER);
        if let Some(existing) = headers.get(&name) {
            let existing = existing.to_str().map_err(|_| {
                ConnectorError::InvalidRequest(format!(
                    "{CLIENT_REQUEST_ID_HEADER} header is not valid ASCII"
                ))
            })?;
            return Ok(Some(existing.to_owned()));
        }

        let id = CorrelationId::generate();
        let value = HeaderValue::from_str(id.as_str())
            .map_err(|err| ConnectorError::InvalidRequest(err.to_string()))?;
        headers.insert(name, value);
        Ok(Some(id.0))
    }
}
