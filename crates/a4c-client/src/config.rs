//! Connection settings for [`crate::ProtocolClients`].

use std::time::Duration;

use crate::error::ProtocolClientError;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8088";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Root URL of the platform, without the `rest/latest` prefix.
    pub base_url: String,
    /// Upper bound for a single HTTP exchange.
    pub request_timeout: Duration,
    /// Accept self-signed certificates (development only).
    pub skip_cert_verification: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            skip_cert_verification: false,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Build a configuration from environment variables.
    ///
    /// - `A4C_URL`: platform root URL (default: `http://127.0.0.1:8088`)
    /// - `A4C_REQUEST_TIMEOUT_MS`: per-request timeout (default: 30000)
    /// - `A4C_SKIP_CERT_VERIFICATION`: `true`/`1` to accept invalid certificates
    pub fn from_env() -> Result<Self, ProtocolClientError> {
        let base_url = std::env::var("A4C_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let request_timeout_ms: u64 = std::env::var("A4C_REQUEST_TIMEOUT_MS")
            .unwrap_or_else(|_| "30000".to_string())
            .parse()
            .map_err(|e| {
                ProtocolClientError::Config(format!("invalid A4C_REQUEST_TIMEOUT_MS: {e}"))
            })?;

        let skip_cert_verification = std::env::var("A4C_SKIP_CERT_VERIFICATION")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        Ok(Self {
            base_url,
            request_timeout: Duration::from_millis(request_timeout_ms),
            skip_cert_verification,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_skip_cert_verification(mut self, skip: bool) -> Self {
        self.skip_cert_verification = skip;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_targets_local_platform() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(!config.skip_cert_verification);
    }

    #[test]
    fn builder_methods_override_fields() {
        let config = ClientConfig::new("https://a4c.example.org")
            .with_request_timeout(Duration::from_secs(5))
            .with_skip_cert_verification(true)
            .with_base_url("https://other.example.org/a4c");

        assert_eq!(config.base_url, "https://other.example.org/a4c");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert!(config.skip_cert_verification);
    }
}
