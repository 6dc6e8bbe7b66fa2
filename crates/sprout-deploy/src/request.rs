//! Deployment request description.

use std::path::PathBuf;

use crate::error::{DeployError, DeployResult};

/// Everything a deployment needs, resolved before the pipeline starts.
///
/// The struct is plain data. Validation happens once when the pipeline
/// accepts the request, not field by field as it runs.
#[derive(Debug, Clone)]
pub struct DeployRequest {
    /// Directory the bundle is produced from.
    pub source_dir: PathBuf,
    /// Application the version is registered under.
    pub application_name: String,
    /// Environment updated to the new version. May stay empty for
    /// upload-only runs.
    pub environment_name: String,
    /// Bucket the bundle is uploaded to, as a URL.
    pub bucket_url: String,
    /// Base name that version labels are derived from.
    pub label_base: String,
}

impl DeployRequest {
    /// Builds a request. No field is checked here; call
    /// [`validate`](Self::validate) or
    /// [`validate_upload`](Self::validate_upload) before running.
    pub fn new(
        source_dir: impl Into<PathBuf>,
        application_name: impl Into<String>,
        environment_name: impl Into<String>,
        bucket_url: impl Into<String>,
        label_base: impl Into<String>,
    ) -> Self {
        Self {
            source_dir: source_dir.into(),
            application_name: application_name.into(),
            environment_name: environment_name.into(),
            bucket_url: bucket_url.into(),
            label_base: label_base.into(),
        }
    }

    /// Checks the fields an upload needs.
    pub fn validate_upload(&self) -> DeployResult<()> {
        if self.application_name.is_empty() {
            return Err(DeployError::Config("application name is empty".to_owned()));
        }
        if self.bucket_url.is_empty() {
            return Err(DeployError::Config("bucket URL is empty".to_owned()));
        }
        if self.label_base.is_empty() {
            return Err(DeployError::Config("label base is empty".to_owned()));
        }
        Ok(())
    }

    /// Checks the fields a full deployment needs.
    pub fn validate(&self) -> DeployResult<()> {
        self.validate_upload()?;
        if self.environment_name.is_empty() {
            return Err(DeployError::Config("environment name is empty".to_owned()));
        }
        Ok(())
    }
}
