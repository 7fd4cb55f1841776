//! Client identity sent as `User-Agent`.
//!
//! Format: `<Product>/<version> (<runtime> <runtimeVersion>; <osName>)`,
//! e.g. `BotBuilder/0.1.0 (Rust 1.82.0; linux)`.

use std::sync::Arc;

/// Product name placed at the front of the user agent.
pub const PRODUCT_NAME: &str = "BotBuilder";
/// Version used when build metadata does not provide one.
pub const FALLBACK_VERSION: &str = "4.0.0";
/// Runtime name placed inside the parenthesised comment.
pub const RUNTIME_NAME: &str = "Rust";

const UNKNOWN: &str = "unknown";

/// Source of version information for the user agent.
pub trait BuildMetadata: Send + Sync {
    /// Product version, `None` when it cannot be determined.
    fn product_version(&self) -> Option<String>;
    /// Version of the host runtime.
    fn runtime_version(&self) -> Option<String>;
    /// Host operating system name.
    fn os_name(&self) -> Option<String>;
}

/// Reads the crate version from Cargo and the compiler version recorded by
/// the build script.
#[derive(Clone, Copy, Debug, Default)]
pub struct CargoBuildMetadata;

impl BuildMetadata for CargoBuildMetadata {
    fn product_version(&self) -> Option<String> {
        option_env!("CARGO_PKG_VERSION")
            .filter(|version| !version.is_empty())
            .map(str::to_owned)
    }

    fn runtime_version(&self) -> Option<String> {
        option_env!("BOTCONNECTOR_RUSTC_VERSION")
            .filter(|version| !version.is_empty())
            .map(str::to_owned)
    }

    fn os_name(&self) -> Option<String> {
        Some(std::env::consts::OS.to_owned())
    }
}

#[derive(Clone)]
pub struct UserAgentBuilder {
    metadata: Arc<dyn BuildMetadata>,
}

impl Default for UserAgentBuilder {
    fn default() -> Self {
        Self::new(Arc::new(CargoBuildMetadata))
    }
}

impl UserAgentBuilder {
    pub fn new(metadata: Arc<dyn BuildMetadata>) -> Self {
        Self { metadata }
    }

    /// Never fails: missing metadata is replaced by fallbacks.
    pub fn build(&self) -> String {
        let version = match self.metadata.product_version() {
            Some(version) if !version.trim().is_empty() => version,
            _ => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    fallback = FALLBACK_VERSION,
                    "product version unavailable from build metadata; using fallback"
                );
                FALLBACK_VERSION.to_owned()
            }
        };
        let runtime_version = self
            .metadata
            .runtime_version()
            .unwrap_or_else(|| UNKNOWN.to_owned());
        let os_name = self.metadata.os_name().unwrap_or_else(|| UNKNOWN.to_owned());

        sanitize(&format!(
            "{PRODUCT_NAME}/{version} ({RUNTIME_NAME} {runtime_version}; {os_name})"
        ))
    }
}

// Header values must be visible ASCII; replace anything else rather than fail.
fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| if c == ' ' || c.is_ascii_graphic() { c } else { '_' })
        .collect()
}
