use bytes::Bytes;
use reqwest::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    Method,
};
use serde::Serialize;

use crate::{ConnectorError, Result};

/// Header carrying a request-scoped deduplication token.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// A single logical call, decorated by the pipeline before dispatch.
///
/// `target` is either a path relative to the client's base endpoint or an
/// absolute `http(s)://` URL.
#[derive(Clone, Debug)]
pub struct OutboundRequest {
    method: Method,
    target: String,
    headers: HeaderMap,
    body: Option<Bytes>,
    idempotent: bool,
}

impl OutboundRequest {
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        let idempotent = is_idempotent_method(&method);
        Self {
            method,
            target: target.into(),
            headers: HeaderMap::new(),
            body: None,
            idempotent,
        }
    }

    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::GET, target)
    }

    pub fn post(target: impl Into<String>) -> Self {
        Self::new(Method::POST, target)
    }

    pub fn put(target: impl Into<String>) -> Self {
        Self::new(Method::PUT, target)
    }

    pub fn delete(target: impl Into<String>) -> Self {
        Self::new(Method::DELETE, target)
    }

    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ConnectorError::InvalidRequest(format!("invalid header name '{name}'")))?;
        let value = HeaderValue::from_str(value).map_err(|_| {
            ConnectorError::InvalidRequest(format!("invalid value for header '{name}'"))
        })?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let encoded = serde_json::to_vec(body)
            .map_err(|err| ConnectorError::InvalidRequest(format!("unserializable body: {err}")))?;
        self.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self.body = Some(Bytes::from(encoded));
        Ok(self)
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Overrides the method-derived idempotency of this operation.
    pub fn idempotent(mut self, idempotent: bool) -> Self {
        self.idempotent = idempotent;
        self
    }

    /// Attaches a deduplication token, which makes a non-idempotent call safe to retry.
    pub fn idempotency_key(self, key: &str) -> Result<Self> {
        self.header(IDEMPOTENCY_KEY_HEADER, key)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub(crate) fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub(crate) fn body_bytes(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Whether repeating this request cannot cause a duplicate side effect.
    pub fn is_retry_safe(&self) -> bool {
        self.idempotent || self.headers.contains_key(IDEMPOTENCY_KEY_HEADER)
    }
}

fn is_idempotent_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::PUT | Method::DELETE | Method::OPTIONS | Method::TRACE
    )
}

/// Joins a relative target onto the base endpoint; absolute URLs pass through.
pub(crate) fn resolve_url(base_endpoint: &str, target: &str) -> String {
    if target.starts_with("http://") || target.starts_with("https://") {
        return target.to_owned();
    }
    format!(
        "{}/{}",
        base_endpoint.trim_end_matches('/'),
        target.trim_start_matches('/')
    )
}

/// Builds a path from raw segments, percent-encoding each one.
pub(crate) fn encode_path(segments: &[&str]) -> Result<String> {
    let mut url = reqwest::Url::parse("http://localhost/")
        .map_err(|err| ConnectorError::InvalidRequest(err.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| ConnectorError::InvalidRequest("cannot build request path".to_owned()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url.path().to_owned())
}
