//! Client configuration.

use url::Url;

use crate::credentials::Credentials;
use crate::error::{ApiError, ApiResult};

/// Region used when `AWS_REGION` is not set.
pub const DEFAULT_REGION: &str = "us-east-1";

const fn default_timeout_secs() -> u64 {
    30
}

/// Immutable configuration for an [`ApiClient`](crate::ApiClient).
///
/// Built once before any request is issued. Changing the target mid-flight
/// is not supported; construct a new client instead.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Service endpoint. The path is preserved on every request.
    pub endpoint: Url,
    /// Signing region.
    pub region: String,
    /// Key pair used to sign requests.
    pub credentials: Credentials,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl ApiConfig {
    /// Builds a configuration with the default timeout.
    pub fn new(endpoint: Url, region: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            endpoint,
            region: region.into(),
            credentials,
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Reads the configuration from the process environment.
    ///
    /// The region comes from `AWS_REGION` (default `us-east-1`). The
    /// endpoint comes from `ELASTICBEANSTALK_URL` when set, otherwise it
    /// is derived from the region.
    pub fn from_env() -> ApiResult<Self> {
        let credentials = Credentials::from_env()?;
        let region = std::env::var("AWS_REGION").unwrap_or_else(|_| DEFAULT_REGION.to_owned());
        let raw = std::env::var("ELASTICBEANSTALK_URL")
            .unwrap_or_else(|_| format!("https://elasticbeanstalk.{region}.amazonaws.com"));
        let endpoint = Url::parse(&raw).map_err(|e| ApiError::InvalidEndpoint {
            url: raw,
            message: e.to_string(),
        })?;
        Ok(Self::new(endpoint, region, credentials))
    }

    /// Overrides the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}
