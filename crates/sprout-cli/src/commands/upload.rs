//! Upload command - bundle the tree and register an application version.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use sprout_api::{ApiClient, ApiConfig, ApiError};
use sprout_deploy::{
    ArchiveProducer, BucketUrl, DeployError, DeployRequest, Deployer, ObjectBundleStore,
    ZipCommandProducer,
};

use crate::defaults::{self, DefaultsError, Target};

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("zip not found on PATH. Install zip and retry")]
    ZipNotFound,

    #[error(transparent)]
    Defaults(#[from] DefaultsError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Deploy(#[from] DeployError),
}

pub async fn run(target: Target) -> Result<(), UploadError> {
    if which::which("zip").is_err() {
        return Err(UploadError::ZipNotFound);
    }

    let resolved = defaults::resolve(&target)?;
    let application = defaults::require(resolved.application, "app")?;
    let bucket = defaults::require(resolved.bucket, "bucket")?;
    let label = defaults::require(resolved.label, "label")?;

    let config = ApiConfig::from_env()?;
    let bucket_url = BucketUrl::parse(&bucket)?;
    let store = ObjectBundleStore::open(&bucket_url, &config.credentials, &config.region)?;
    let api = ApiClient::new(config)?;

    let started = Instant::now();
    let deployer =
        Deployer::new(Arc::new(store), Arc::new(api)).with_cancellation(super::cancel_on_ctrl_c());

    let mut stream = ZipCommandProducer::default().produce(&target.dir).await?;
    let request = DeployRequest::new(&target.dir, application, "", bucket, label);
    let version = deployer.upload(request, &mut stream).await?;

    println!(
        "Uploaded {}/{} as label {} ({:.1} MB, took {:.1?})",
        bucket_url.bucket,
        version.object_key,
        version.full_label,
        version.bytes_sent as f64 / 1024.0 / 1024.0,
        started.elapsed()
    );
    Ok(())
}
