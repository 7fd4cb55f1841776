use reqwest::header::{self, HeaderMap, HeaderValue};

use crate::{ConnectorError, Result};

/// Locale sent when nothing else is configured.
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Attaches `Accept-Language` to every outbound request.
#[derive(Clone, Copy, Debug, Default)]
pub struct LanguageNegotiator;

impl LanguageNegotiator {
    pub fn apply(&self, preferred_language: &str, headers: &mut HeaderMap) -> Result<()> {
        let language = preferred_language.trim();
        let language = if language.is_empty() {
            DEFAULT_LANGUAGE
        } else {
            language
        };
        let value = HeaderValue::from_str(language).map_err(|_| {
            ConnectorError::InvalidRequest(format!("invalid Accept-Language value '{language}'"))
        })?;
        headers.insert(header::ACCEPT_LANGUAGE, value);
        Ok(())
    }
}
