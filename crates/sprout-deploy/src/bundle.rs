//! Source bundle production.
//!
//! A bundle is a zip archive of a source directory, produced by the
//! external `zip` command so the archive layout matches what the
//! platform extracts. When the directory contains a `.sprout-bundle`
//! script, the script is run first with a scratch directory as its
//! argument and the archive is built from whatever it wrote there.

use std::path::Path;
use std::process::Stdio;

use bytes::{Bytes, BytesMut};
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tracing::debug;

use crate::error::{DeployError, DeployResult};

/// Script run to prepare the bundle contents, when present.
pub const BUNDLE_SCRIPT: &str = ".sprout-bundle";

const CHUNK_SIZE: usize = 64 * 1024;

/// A bundle being read as a stream of chunks.
///
/// When the stream is backed by a child process, reaching end of stream
/// waits for the process and surfaces a non-zero exit as an error, so a
/// truncated archive is never mistaken for a complete one.
pub struct BundleStream {
    reader: Box<dyn AsyncRead + Send + Unpin>,
    child: Option<Child>,
    scratch: Option<TempDir>,
    buf: BytesMut,
}

impl BundleStream {
    /// Wraps an existing reader, for example an already written bundle
    /// file.
    pub fn from_reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            child: None,
            scratch: None,
            buf: BytesMut::with_capacity(CHUNK_SIZE),
        }
    }

    /// Reads the next chunk, or `None` at end of stream.
    pub async fn next_chunk(&mut self) -> std::io::Result<Option<Bytes>> {
        self.buf.reserve(CHUNK_SIZE);
        let n = self.reader.read_buf(&mut self.buf).await?;
        if n == 0 {
            self.finish().await?;
            return Ok(None);
        }
        Ok(Some(self.buf.split().freeze()))
    }

    async fn finish(&mut self) -> std::io::Result<()> {
        if let Some(mut child) = self.child.take() {
            let status = child.wait().await?;
            if !status.success() {
                return Err(std::io::Error::other(format!(
                    "bundle command exited with {status}"
                )));
            }
        }
        self.scratch.take();
        Ok(())
    }
}

/// Produces bundle streams for source directories.
#[async_trait::async_trait]
pub trait ArchiveProducer: Send + Sync {
    /// Produces a zip archive stream for `dir`.
    async fn produce(&self, dir: &Path) -> DeployResult<BundleStream>;
}

/// Produces bundles with the external `zip` command, honouring the
/// [`BUNDLE_SCRIPT`] hook.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipCommandProducer;

#[async_trait::async_trait]
impl ArchiveProducer for ZipCommandProducer {
    async fn produce(&self, dir: &Path) -> DeployResult<BundleStream> {
        let script = dir.join(BUNDLE_SCRIPT);
        let has_script = tokio::fs::metadata(&script)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);

        if has_script {
            let scratch = TempDir::new().map_err(DeployError::bundle)?;
            run_bundle_script(&script, dir, scratch.path()).await?;
            let scratch_path = scratch.path().to_path_buf();
            spawn_zip(&scratch_path, Some(scratch))
        } else {
            spawn_zip(dir, None)
        }
    }
}

/// Runs the bundle script with `dir` as its working directory and the
/// scratch directory as its only argument.
async fn run_bundle_script(script: &Path, dir: &Path, out_dir: &Path) -> DeployResult<()> {
    debug!(script = %script.display(), "running bundle script");
    let status = Command::new(script)
        .arg(out_dir)
        .current_dir(dir)
        .status()
        .await
        .map_err(|e| DeployError::Bundle(format!("failed to run {}: {e}", script.display())))?;
    if !status.success() {
        return Err(DeployError::Bundle(format!(
            "bundle script {} exited with {status}",
            script.display()
        )));
    }
    Ok(())
}

fn spawn_zip(dir: &Path, scratch: Option<TempDir>) -> DeployResult<BundleStream> {
    let mut child = Command::new("zip")
        .args(["-r", "-", "."])
        .current_dir(dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                DeployError::Bundle("zip command not found on PATH".to_owned())
            }
            _ => DeployError::Bundle(format!("failed to start zip: {e}")),
        })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| DeployError::Bundle("zip stdout was not captured".to_owned()))?;

    Ok(BundleStream {
        reader: Box::new(stdout),
        child: Some(child),
        scratch,
        buf: BytesMut::with_capacity(CHUNK_SIZE),
    })
}

/// Produces a bundle for `dir` and writes it to `out`, returning the
/// byte count written.
pub async fn write_bundle_file(
    producer: &dyn ArchiveProducer,
    dir: &Path,
    out: &Path,
) -> DeployResult<u64> {
    let mut stream = producer.produce(dir).await?;
    let mut file = tokio::fs::File::create(out)
        .await
        .map_err(|e| DeployError::Bundle(format!("failed to create {}: {e}", out.display())))?;

    let mut bytes_written = 0u64;
    while let Some(chunk) = stream.next_chunk().await.map_err(DeployError::bundle)? {
        bytes_written += chunk.len() as u64;
        file.write_all(&chunk)
            .await
            .map_err(|e| DeployError::Bundle(format!("failed to write {}: {e}", out.display())))?;
    }
    file.flush()
        .await
        .map_err(|e| DeployError::Bundle(format!("failed to write {}: {e}", out.display())))?;
    Ok(bytes_written)
}
