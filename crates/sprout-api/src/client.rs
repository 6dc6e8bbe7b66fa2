//! HTTP client for signed query-parameter operations.
//!
//! Every operation is a single request whose inputs are flattened into
//! the query string alongside an `Operation` parameter naming the call.
//! Requests carry an empty body and are signed over the query string and
//! the `host` and `x-amz-date` headers.

use chrono::Utc;
use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::params::Params;
use crate::sign;

/// Service name used in the signature credential scope.
const SERVICE: &str = "elasticbeanstalk";

/// A client bound to one endpoint and set of credentials.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl ApiClient {
    /// Builds a client from the given configuration.
    pub fn new(config: ApiConfig) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { http, config })
    }

    /// Issues an operation and discards any response body.
    pub(crate) async fn execute(
        &self,
        method: Method,
        operation: &str,
        params: &Params,
    ) -> ApiResult<()> {
        self.send(method, operation, params).await?;
        Ok(())
    }

    /// Issues an operation and decodes the JSON response body.
    pub(crate) async fn execute_decoded<T: DeserializeOwned>(
        &self,
        method: Method,
        operation: &str,
        params: &Params,
    ) -> ApiResult<T> {
        let response = self.send(method, operation, params).await?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|source| ApiError::Decode {
            operation: operation.to_owned(),
            source,
        })
    }

    async fn send(
        &self,
        method: Method,
        operation: &str,
        params: &Params,
    ) -> ApiResult<reqwest::Response> {
        // The Operation parameter leads the query; the remaining pairs
        // keep their caller ordering.
        let mut full = Params::new();
        full.push("Operation", operation);
        for (key, value) in params.pairs() {
            full.push(key.clone(), value.clone());
        }

        let mut url = self.config.endpoint.clone();
        url.set_query(Some(&full.encode()));

        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_owned(),
            (None, _) => {
                return Err(ApiError::InvalidEndpoint {
                    url: url.to_string(),
                    message: "endpoint has no host".to_owned(),
                });
            }
        };

        let amz_date = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
        let authorization = sign::sign_request(
            method.as_str(),
            url.path(),
            &full,
            &host,
            &amz_date,
            &self.config.credentials,
            &self.config.region,
            SERVICE,
        )
        .ok_or(ApiError::Signing)?;

        debug!(operation, method = %method, "issuing platform API request");

        let response = self
            .http
            .request(method, url)
            .header("accept", "application/json")
            .header("x-amz-date", &amz_date)
            .header("authorization", authorization)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(ApiError::Status {
                code: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("unknown").to_owned(),
                body,
            });
        }

        Ok(response)
    }
}
