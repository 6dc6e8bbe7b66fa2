//! Signed query-parameter client for the application platform API.
//!
//! This crate provides:
//! - A client that encodes operation inputs as flattened query
//!   parameters and signs each request
//! - Typed parameter and description structs for the application
//!   version and environment operations
//! - The epoch-seconds timestamp codec used on version records
//!
//! Operations follow a single wire convention: the operation name is
//! carried as an `Operation` query parameter, list inputs flatten to
//! 1-based `Prefix.member.N` keys, and responses decode from plain JSON
//! result objects.

pub mod client;
pub mod config;
pub mod credentials;
pub mod environment;
pub mod error;
pub mod params;
mod sign;
pub mod timestamp;
pub mod version;

// Re-export client and configuration types
pub use client::ApiClient;
pub use config::{ApiConfig, DEFAULT_REGION};
pub use credentials::Credentials;

// Re-export error types
pub use error::{ApiError, ApiResult};

// Re-export parameter encoding
pub use params::Params;

// Re-export timestamp codec
pub use timestamp::{EpochSeconds, ParseEpochSecondsError};

// Re-export application version operations
pub use version::{
    ApplicationVersionDescription, CreateApplicationVersionParams,
    DescribeApplicationVersionsParams, S3Location, SourceBundle,
};

// Re-export environment operations
pub use environment::{
    ConfigurationOptionSetting, DescribeEnvironmentsParams, EnvironmentDescription,
    EnvironmentTier, UpdateEnvironmentParams,
};
