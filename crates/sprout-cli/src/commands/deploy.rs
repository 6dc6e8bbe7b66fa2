//! Deploy command - bundle, upload and update the environment.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use sprout_api::{ApiClient, ApiConfig, ApiError};
use sprout_deploy::{
    BucketUrl, DeployError as PipelineError, DeployRequest, Deployer, ObjectBundleStore,
};

use crate::defaults::{self, DefaultsError, Target};

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("zip not found on PATH. Install zip and retry")]
    ZipNotFound,

    #[error(transparent)]
    Defaults(#[from] DefaultsError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

pub async fn run(target: Target) -> Result<(), DeployError> {
    if which::which("zip").is_err() {
        return Err(DeployError::ZipNotFound);
    }

    let resolved = defaults::resolve(&target)?;
    let application = defaults::require(resolved.application, "app")?;
    let environment = defaults::require(resolved.environment, "env")?;
    let bucket = defaults::require(resolved.bucket, "bucket")?;
    let label = defaults::require(resolved.label, "label")?;

    println!("Deploying {} to {}", application, environment);

    let config = ApiConfig::from_env()?;
    let bucket_url = BucketUrl::parse(&bucket)?;
    let store = ObjectBundleStore::open(&bucket_url, &config.credentials, &config.region)?;
    let api = ApiClient::new(config)?;

    let started = Instant::now();
    let deployer =
        Deployer::new(Arc::new(store), Arc::new(api)).with_cancellation(super::cancel_on_ctrl_c());

    let request = DeployRequest::new(&target.dir, application, environment, bucket, label);
    let outcome = deployer.deploy(request).await?;

    println!(
        "Uploaded {} as label {} ({:.1} MB)",
        outcome.version.object_key,
        outcome.version.full_label,
        outcome.version.bytes_sent as f64 / 1024.0 / 1024.0
    );
    println!("Deploy initiated (took {:.1?})", started.elapsed());
    Ok(())
}
