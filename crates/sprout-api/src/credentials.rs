//! Access credentials for request signing.

use secrecy::SecretString;

use crate::error::{ApiError, ApiResult};

/// A key pair used to sign outgoing requests.
///
/// The secret key is wrapped so it never appears in debug output or
/// accidental logging.
#[derive(Clone)]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: SecretString,
}

impl Credentials {
    /// Builds credentials from an access key id and secret key.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::new(secret_access_key.into()),
        }
    }

    /// Reads credentials from the process environment.
    ///
    /// `AWS_ACCESS_KEY_ID` is required. The secret is read from
    /// `AWS_SECRET_ACCESS_KEY`, falling back to the older
    /// `AWS_SECRET_KEY` name.
    pub fn from_env() -> ApiResult<Self> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID")
            .map_err(|_| ApiError::MissingCredentials("AWS_ACCESS_KEY_ID"))?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY")
            .or_else(|_| std::env::var("AWS_SECRET_KEY"))
            .map_err(|_| ApiError::MissingCredentials("AWS_SECRET_ACCESS_KEY"))?;
        Ok(Self::new(access_key_id, secret_access_key))
    }

    /// The access key id, sent in clear within the signature scope.
    #[must_use]
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// The secret key. Callers must expose it only inside the signer.
    #[must_use]
    pub fn secret_access_key(&self) -> &SecretString {
        &self.secret_access_key
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .finish()
    }
}
