//! Sprout Deployment Pipeline
//!
//! This crate drives the full deployment pipeline for the application
//! platform: bundle a source tree, upload it to object storage under a
//! collision-free version label, register it as an application version
//! and point an environment at it.
//!
//! # Architecture
//!
//! The pipeline is responsible for:
//!
//! - **Bundling**: Zipping the source tree with the external `zip`
//!   command, honouring a `.sprout-bundle` build script when present
//! - **Label allocation**: Probing the bucket for the first free
//!   `{base}-{n}` version label
//! - **Upload**: Streaming the archive into the bucket without holding
//!   the whole bundle in memory
//! - **Registration**: Creating the application version and pointing
//!   the environment at it over the platform API
//!
//! # Stage Machine
//!
//! Runs move through a strict stage machine enforced at compile time
//! using the typestate pattern:
//!
//! ```text
//! Naming ──▶ Uploading ──▶ RegisteringVersion ──▶ UpdatingEnvironment
//! ```
//!
//! Every stage is forward-only. There is no rollback: a failure leaves
//! whatever earlier stages created in place, and the error names the
//! stage it happened in.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use sprout_api::{ApiClient, ApiConfig};
//! use sprout_deploy::{BucketUrl, Deployer, DeployRequest, ObjectBundleStore};
//!
//! let config = ApiConfig::from_env()?;
//! let bucket = BucketUrl::parse("https://app-bundles.s3.us-east-1.amazonaws.com")?;
//! let store = ObjectBundleStore::open(&bucket, &config.credentials, &config.region)?;
//! let api = ApiClient::new(config)?;
//!
//! let deployer = Deployer::new(Arc::new(store), Arc::new(api));
//! let outcome = deployer
//!     .deploy(DeployRequest::new(
//!         ".",
//!         "app",
//!         "app-env",
//!         "https://app-bundles.s3.us-east-1.amazonaws.com",
//!         "app",
//!     ))
//!     .await?;
//! println!("deployed {}", outcome.version.full_label);
//! ```

#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]

pub mod bundle;
pub mod error;
pub mod namer;
pub mod pipeline;
pub mod request;
pub mod state;
pub mod store;

// Re-export commonly used types at the crate root
pub use bundle::{
    write_bundle_file, ArchiveProducer, BundleStream, ZipCommandProducer, BUNDLE_SCRIPT,
};
pub use error::{DeployError, DeployResult, DeployStage};
pub use namer::{allocate, AllocatedLabel, MAX_LABEL_ATTEMPTS};
pub use pipeline::{Deployer, PlatformApi};
pub use request::DeployRequest;
pub use state::{
    DeployOutcome, Naming, RegisteredVersion, RegisteringVersion, Run, Stage, UpdatingEnvironment,
    Uploading,
};
pub use store::{BucketUrl, BundleStore, ObjectBundleStore};
