//! Typestate pattern for the deployment pipeline.
//!
//! This module encodes pipeline stages in the type system, making
//! out-of-order stage execution a compile-time error rather than a
//! runtime error. Idle is the absence of a run; a failed run is the
//! error the stage returned, which carries the stage it happened in.
//!
//! # Example
//!
//! ```ignore
//! let run = Run::<Naming>::start(request);
//! let run = run.named(label);
//! let run = run.uploaded(bytes);
//! let run = run.registered();
//! let outcome = run.updated();
//! // run.registered() again would not compile - stage already passed
//! ```

use std::marker::PhantomData;

use crate::error::DeployStage;
use crate::namer::AllocatedLabel;
use crate::request::DeployRequest;

// =============================================================================
// Stage marker types (zero-sized)
// =============================================================================

/// Marker trait for pipeline stages.
pub trait Stage: private::Sealed + Send + Sync {
    /// The stage value used in errors and log fields.
    fn stage() -> DeployStage;

    /// The stage name for messages.
    fn name() -> &'static str {
        Self::stage().as_str()
    }
}

mod private {
    pub trait Sealed {}
}

/// Scanning the bucket for a free version label.
#[derive(Debug, Clone, Copy)]
pub struct Naming;

/// Streaming the bundle into the bucket.
#[derive(Debug, Clone, Copy)]
pub struct Uploading;

/// Registering the uploaded bundle as an application version.
#[derive(Debug, Clone, Copy)]
pub struct RegisteringVersion;

/// Pointing the environment at the new version.
#[derive(Debug, Clone, Copy)]
pub struct UpdatingEnvironment;

// Implement the sealed trait
impl private::Sealed for Naming {}
impl private::Sealed for Uploading {}
impl private::Sealed for RegisteringVersion {}
impl private::Sealed for UpdatingEnvironment {}

impl Stage for Naming {
    fn stage() -> DeployStage {
        DeployStage::Naming
    }
}

impl Stage for Uploading {
    fn stage() -> DeployStage {
        DeployStage::Uploading
    }
}

impl Stage for RegisteringVersion {
    fn stage() -> DeployStage {
        DeployStage::RegisteringVersion
    }
}

impl Stage for UpdatingEnvironment {
    fn stage() -> DeployStage {
        DeployStage::UpdatingEnvironment
    }
}

// =============================================================================
// Run struct parameterised by stage
// =============================================================================

/// Everything a run has produced so far.
#[derive(Debug, Clone)]
struct RunData {
    request: DeployRequest,
    full_label: Option<String>,
    object_key: Option<String>,
    bytes_sent: u64,
}

/// A deployment run at a specific stage.
///
/// The stage parameter `S` determines which step can run next. Skipping
/// or repeating a stage is caught at compile time.
#[derive(Debug)]
pub struct Run<S: Stage> {
    data: RunData,
    /// Zero-sized stage marker.
    _stage: PhantomData<S>,
}

impl<S: Stage> Run<S> {
    /// The request this run was started from.
    #[must_use]
    pub fn request(&self) -> &DeployRequest {
        &self.data.request
    }

    /// The current stage.
    #[must_use]
    pub fn stage(&self) -> DeployStage {
        S::stage()
    }

    /// The stage name.
    #[must_use]
    pub fn stage_name(&self) -> &'static str {
        S::name()
    }

    /// Allocated version label, empty before naming completes.
    #[must_use]
    pub fn full_label(&self) -> &str {
        self.data.full_label.as_deref().unwrap_or("")
    }

    /// Object key the bundle is uploaded under, empty before naming
    /// completes.
    #[must_use]
    pub fn object_key(&self) -> &str {
        self.data.object_key.as_deref().unwrap_or("")
    }

    /// Internal helper to transition to the next stage.
    fn transition<T: Stage>(self) -> Run<T> {
        Run {
            data: self.data,
            _stage: PhantomData,
        }
    }

    /// Internal helper to transition with data modification.
    fn transition_with<T: Stage>(mut self, f: impl FnOnce(&mut RunData)) -> Run<T> {
        f(&mut self.data);
        Run {
            data: self.data,
            _stage: PhantomData,
        }
    }
}

// =============================================================================
// Stage transitions
// =============================================================================

impl Run<Naming> {
    /// Starts a run for a request. The first thing a run does is
    /// allocate a label, so a fresh run is already at the naming stage.
    #[must_use]
    pub fn start(request: DeployRequest) -> Self {
        Self {
            data: RunData {
                request,
                full_label: None,
                object_key: None,
                bytes_sent: 0,
            },
            _stage: PhantomData,
        }
    }

    /// Records the allocated label and moves to uploading.
    #[must_use]
    pub fn named(self, label: AllocatedLabel) -> Run<Uploading> {
        self.transition_with(|data| {
            data.full_label = Some(label.full_label);
            data.object_key = Some(label.key);
        })
    }
}

impl Run<Uploading> {
    /// Records the uploaded byte count and moves to registration.
    #[must_use]
    pub fn uploaded(self, bytes_sent: u64) -> Run<RegisteringVersion> {
        self.transition_with(|data| {
            data.bytes_sent = bytes_sent;
        })
    }
}

impl Run<RegisteringVersion> {
    /// Moves to the environment update after the version is registered.
    #[must_use]
    pub fn registered(self) -> Run<UpdatingEnvironment> {
        self.transition()
    }
}

impl Run<UpdatingEnvironment> {
    /// Completes the run after the environment update.
    #[must_use]
    pub fn updated(self) -> DeployOutcome {
        let environment = self.data.request.environment_name.clone();
        DeployOutcome {
            version: self.into_version(),
            environment,
        }
    }

    /// Completes an upload-only run, which stops once the version
    /// exists and never touches an environment.
    #[must_use]
    pub fn into_version(self) -> RegisteredVersion {
        RegisteredVersion {
            full_label: self.data.full_label.unwrap_or_default(),
            object_key: self.data.object_key.unwrap_or_default(),
            bytes_sent: self.data.bytes_sent,
        }
    }
}

// =============================================================================
// Run results
// =============================================================================

/// An application version that now exists on the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredVersion {
    /// Label the version was registered under.
    pub full_label: String,
    /// Object key of the uploaded bundle.
    pub object_key: String,
    /// Bundle size in bytes.
    pub bytes_sent: u64,
}

/// The result of a completed deployment.
#[derive(Debug, Clone)]
pub struct DeployOutcome {
    /// The version the environment now runs.
    pub version: RegisteredVersion,
    /// Environment that was updated.
    pub environment: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_request() -> DeployRequest {
        DeployRequest::new(
            "/srv/app",
            "app",
            "app-env",
            "https://app-bundles.s3.us-east-1.amazonaws.com",
            "app",
        )
    }

    fn test_label() -> AllocatedLabel {
        AllocatedLabel {
            full_label: "app-3".to_owned(),
            key: "app-3.zip".to_owned(),
        }
    }

    #[test]
    fn happy_path_transitions() {
        let run = Run::<Naming>::start(test_request());
        assert_eq!(run.stage(), DeployStage::Naming);
        assert_eq!(run.full_label(), "");

        let run = run.named(test_label());
        assert_eq!(run.stage(), DeployStage::Uploading);
        assert_eq!(run.full_label(), "app-3");
        assert_eq!(run.object_key(), "app-3.zip");

        let run = run.uploaded(1024);
        assert_eq!(run.stage(), DeployStage::RegisteringVersion);

        let run = run.registered();
        assert_eq!(run.stage(), DeployStage::UpdatingEnvironment);

        let outcome = run.updated();
        assert_eq!(outcome.environment, "app-env");
        assert_eq!(outcome.version.full_label, "app-3");
        assert_eq!(outcome.version.bytes_sent, 1024);
    }

    #[test]
    fn upload_only_exit_keeps_version_details() {
        let version = Run::<Naming>::start(test_request())
            .named(test_label())
            .uploaded(2048)
            .registered()
            .into_version();
        assert_eq!(
            version,
            RegisteredVersion {
                full_label: "app-3".to_owned(),
                object_key: "app-3.zip".to_owned(),
                bytes_sent: 2048,
            }
        );
    }

    #[test]
    fn stage_names_match_error_stages() {
        let run = Run::<Naming>::start(test_request());
        assert_eq!(run.stage_name(), "naming");
        let run = run.named(test_label());
        assert_eq!(run.stage_name(), "uploading");
    }
}
