//! Error types for the deployment pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sprout_api::ApiError;

/// Pipeline stage for error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployStage {
    /// Scanning the bucket for a free version label.
    Naming,
    /// Streaming the bundle into the bucket.
    Uploading,
    /// Registering the uploaded bundle as an application version.
    RegisteringVersion,
    /// Pointing the environment at the new version.
    UpdatingEnvironment,
}

impl DeployStage {
    /// Stable kebab-case name, used in log fields and messages.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Naming => "naming",
            Self::Uploading => "uploading",
            Self::RegisteringVersion => "registering-version",
            Self::UpdatingEnvironment => "updating-environment",
        }
    }
}

impl std::fmt::Display for DeployStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during deployment operations.
#[derive(Debug, Error)]
pub enum DeployError {
    // ─────────────────────────────────────────────────────────────────────────
    // Request errors
    // ─────────────────────────────────────────────────────────────────────────
    /// The request is missing or carries an unusable field.
    #[error("invalid deployment request: {0}")]
    Config(String),

    // ─────────────────────────────────────────────────────────────────────────
    // Label allocation errors
    // ─────────────────────────────────────────────────────────────────────────
    /// An existence probe against the bucket failed, so whether the
    /// candidate label is free is unknown.
    #[error("failed to probe bundle key {key}: {source}")]
    Probe {
        /// Object key that was being probed.
        key: String,
        #[source]
        source: object_store::Error,
    },

    /// Every candidate label was already taken.
    #[error(
        "no free version label for {label_base} in {container} after {} attempts (too many bundles with the same base name?)",
        crate::namer::MAX_LABEL_ATTEMPTS
    )]
    NamespaceExhausted {
        /// Label base that was being allocated.
        label_base: String,
        /// Bucket that was scanned.
        container: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Bundle errors
    // ─────────────────────────────────────────────────────────────────────────
    /// The bundle archive could not be produced.
    #[error("failed to produce bundle: {0}")]
    Bundle(String),

    // ─────────────────────────────────────────────────────────────────────────
    // Upload errors
    // ─────────────────────────────────────────────────────────────────────────
    /// The bundle could not be written to the bucket.
    #[error("failed to upload bundle {key}: {message}")]
    Transfer {
        /// Destination object key.
        key: String,
        /// Underlying failure.
        message: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Platform API errors
    // ─────────────────────────────────────────────────────────────────────────
    /// A platform API call failed. Everything completed before this
    /// stage stays in place.
    #[error("platform API call failed during {stage}: {source}")]
    Api {
        /// Stage the call belonged to.
        stage: DeployStage,
        #[source]
        source: ApiError,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Cancellation
    // ─────────────────────────────────────────────────────────────────────────
    /// The deployment was cancelled before this stage completed.
    #[error("deployment cancelled during {stage}")]
    Cancelled {
        /// Stage that observed the cancellation.
        stage: DeployStage,
    },
}

impl DeployError {
    /// Builds a [`DeployError::Transfer`] from any displayable failure.
    pub fn transfer(key: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Transfer {
            key: key.into(),
            message: err.to_string(),
        }
    }

    /// Builds a [`DeployError::Bundle`] from any displayable failure.
    pub fn bundle(err: impl std::fmt::Display) -> Self {
        Self::Bundle(err.to_string())
    }

    /// Stage the pipeline failed in, when the error is tied to one.
    /// Request validation fails before a run starts, and bundle errors
    /// can surface either at spawn time or midway through an upload.
    #[must_use]
    pub fn stage(&self) -> Option<DeployStage> {
        match self {
            Self::Config(_) | Self::Bundle(_) => None,
            Self::Probe { .. } | Self::NamespaceExhausted { .. } => Some(DeployStage::Naming),
            Self::Transfer { .. } => Some(DeployStage::Uploading),
            Self::Api { stage, .. } | Self::Cancelled { stage } => Some(*stage),
        }
    }
}

/// Result type alias for deployment operations.
pub type DeployResult<T> = Result<T, DeployError>;
