//! Error types for the platform API client.

/// Convenience alias for API call results.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors surfaced by the API client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // ─────────────────────────────────────────────────────────────────────────
    // Configuration errors
    // ─────────────────────────────────────────────────────────────────────────
    /// The endpoint URL could not be used to build a request.
    #[error("invalid endpoint {url}: {message}")]
    InvalidEndpoint {
        /// Endpoint URL as given.
        url: String,
        /// What was wrong with it.
        message: String,
    },

    /// A required credential variable was absent from the environment.
    #[error("missing credential environment variable {0}")]
    MissingCredentials(&'static str),

    /// Request signature material could not be assembled.
    #[error("failed to compute request signature")]
    Signing,

    // ─────────────────────────────────────────────────────────────────────────
    // Transport errors
    // ─────────────────────────────────────────────────────────────────────────
    /// The HTTP request itself failed (connect, timeout, TLS).
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    // ─────────────────────────────────────────────────────────────────────────
    // Remote errors
    // ─────────────────────────────────────────────────────────────────────────
    /// The service answered with a non-success status code. The body is
    /// preserved verbatim so the caller can surface the remote message.
    #[error("http status {code} ({status_text}): {body}")]
    Status {
        /// Numeric status code.
        code: u16,
        /// Canonical reason phrase for the code.
        status_text: String,
        /// Response body, untouched.
        body: String,
    },

    /// A success response carried a body we could not decode.
    #[error("failed to decode {operation} response")]
    Decode {
        /// Operation whose response was malformed.
        operation: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// Status code of the remote error, if this is one.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_preserves_body_verbatim() {
        let err = ApiError::Status {
            code: 503,
            status_text: "Service Unavailable".to_owned(),
            body: "<Error><Code>Throttling</Code></Error>".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "http status 503 (Service Unavailable): <Error><Code>Throttling</Code></Error>"
        );
        assert_eq!(err.status_code(), Some(503));
    }

    #[test]
    fn non_status_errors_have_no_code() {
        let err = ApiError::MissingCredentials("AWS_ACCESS_KEY_ID");
        assert_eq!(err.status_code(), None);
    }
}
