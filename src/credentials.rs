use std::fmt;

use reqwest::header::{self, HeaderMap, HeaderValue};

/// Failure reported by a [`CredentialProvider`].
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct CredentialError {
    message: String,
}

impl CredentialError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Attaches authentication material to an outbound request.
///
/// Token acquisition and refresh belong to the provider; the pipeline only
/// asks it to decorate headers once per logical call and never retries an
/// authentication failure.
pub trait CredentialProvider: Send + Sync {
    fn authorize(&self, headers: &mut HeaderMap) -> Result<(), CredentialError>;
}

/// Sends `Authorization: Bearer <token>`.
#[derive(Clone)]
pub struct BearerToken {
    authorization: String,
}

impl BearerToken {
    /// If the token is missing the `Bearer ` prefix, it is added automatically.
    pub fn new(token: impl AsRef<str>) -> Self {
        Self {
            authorization: normalize_bearer_authorization(token.as_ref()),
        }
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerToken")
            .field("authorization", &"<redacted>")
            .finish()
    }
}

impl CredentialProvider for BearerToken {
    fn authorize(&self, headers: &mut HeaderMap) -> Result<(), CredentialError> {
        insert_authorization(headers, &self.authorization)
    }
}

/// Sends a full raw authorization value, e.g. `"Bearer <token>"` or any custom scheme.
#[derive(Clone)]
pub struct RawAuthorization {
    authorization: String,
}

impl RawAuthorization {
    pub fn new(authorization: impl Into<String>) -> Self {
        Self {
            authorization: authorization.into(),
        }
    }
}

impl fmt::Debug for RawAuthorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawAuthorization")
            .field("authorization", &"<redacted>")
            .finish()
    }
}

impl CredentialProvider for RawAuthorization {
    fn authorize(&self, headers: &mut HeaderMap) -> Result<(), CredentialError> {
        insert_authorization(headers, &self.authorization)
    }
}

/// Attaches nothing. Useful against local emulators.
#[derive(Clone, Copy, Debug, Default)]
pub struct Anonymous;

impl CredentialProvider for Anonymous {
    fn authorize(&self, _headers: &mut HeaderMap) -> Result<(), CredentialError> {
        Ok(())
    }
}

fn insert_authorization(headers: &mut HeaderMap, authorization: &str) -> Result<(), CredentialError> {
    if authorization.trim().is_empty() {
        return Err(CredentialError::new("authorization value is empty"));
    }
    let mut value = HeaderValue::from_str(authorization)
        .map_err(|_| CredentialError::new("authorization value is not a valid header value"))?;
    value.set_sensitive(true);
    headers.insert(header::AUTHORIZATION, value);
    Ok(())
}

pub(crate) fn normalize_bearer_authorization(token: &str) -> String {
    let trimmed = token.trim();
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        trimmed.to_owned()
    } else {
        format!("Bearer {trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::{HeaderMap, AUTHORIZATION};

    use super::{
        normalize_bearer_authorization, Anonymous, BearerToken, CredentialProvider,
        RawAuthorization,
    };

    #[test]
    fn normalize_bearer_adds_prefix_when_missing() {
        assert_eq!(
            normalize_bearer_authorization("abc123"),
            "Bearer abc123".to_owned()
        );
    }

    #[test]
    fn normalize_bearer_keeps_existing_prefix() {
        assert_eq!(
            normalize_bearer_authorization("bEaReR abc123"),
            "bEaReR abc123".to_owned()
        );
    }

    #[test]
    fn bearer_token_sets_sensitive_authorization_header() {
        let mut headers = HeaderMap::new();
        BearerToken::new("abc")
            .authorize(&mut headers)
            .expect("bearer token must authorize");
        let value = headers.get(AUTHORIZATION).expect("authorization header");
        assert_eq!(value, "Bearer abc");
        assert!(value.is_sensitive());
    }

    #[test]
    fn empty_raw_authorization_is_rejected() {
        let mut headers = HeaderMap::new();
        let err = RawAuthorization::new("  ")
            .authorize(&mut headers)
            .expect_err("empty authorization must fail");
        assert_eq!(err.to_string(), "authorization value is empty");
        assert!(headers.is_empty());
    }

    #[test]
    fn anonymous_attaches_nothing() {
        let mut headers = HeaderMap::new();
        Anonymous.authorize(&mut headers).expect("anonymous never fails");
        assert!(headers.is_empty());
    }

    #[test]
    fn debug_redacts_authorization_value() {
        let debug = format!("{:?}", RawAuthorization::new("secret-token"));
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret-token"));
    }
}
