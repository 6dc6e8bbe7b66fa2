//! Bundle command - write the zip archive to a local file.

use std::path::Path;
use std::time::Instant;

use thiserror::Error;

use sprout_deploy::{write_bundle_file, DeployError, ZipCommandProducer};

#[derive(Error, Debug)]
pub enum BundleError {
    #[error("zip not found on PATH. Install zip and retry")]
    ZipNotFound,

    #[error(transparent)]
    Deploy(#[from] DeployError),
}

pub async fn run(dir: &Path, out: &Path) -> Result<(), BundleError> {
    if which::which("zip").is_err() {
        return Err(BundleError::ZipNotFound);
    }

    let started = Instant::now();
    let producer = ZipCommandProducer::default();
    let bytes = write_bundle_file(&producer, dir, out).await?;

    println!(
        "Wrote bundle file: {} ({:.1} MB, took {:.1?})",
        out.display(),
        bytes as f64 / 1024.0 / 1024.0,
        started.elapsed()
    );
    Ok(())
}
