//! Bundle storage behind an object store.

use std::sync::Arc;

use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::buffered::BufWriter;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use secrecy::ExposeSecret;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use url::Url;

use sprout_api::Credentials;

use crate::bundle::BundleStream;
use crate::error::{DeployError, DeployResult};

/// Where bundles are written and probed.
///
/// The trait exists so the pipeline can run against an in-test store;
/// production code uses [`ObjectBundleStore`].
#[async_trait::async_trait]
pub trait BundleStore: Send + Sync {
    /// Name of the bucket this store writes into.
    fn container(&self) -> &str;

    /// Whether an object already exists at `key`.
    async fn exists(&self, key: &str) -> DeployResult<bool>;

    /// Writes a complete bundle at `key`.
    async fn put(&self, key: &str, data: Bytes) -> DeployResult<()>;

    /// Streams a bundle into `key`, returning the byte count written.
    async fn put_stream(&self, key: &str, source: &mut BundleStream) -> DeployResult<u64>;
}

/// A bucket location parsed out of a URL.
///
/// Amazon-style hosts carry the bucket as the first host label and may
/// carry the region in an `s3-{region}` or `s3.{region}` label. Any
/// other host is treated as a custom endpoint with the bucket as the
/// first path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketUrl {
    /// Bucket name.
    pub bucket: String,
    /// Region, when the URL names one.
    pub region: Option<String>,
    /// Custom endpoint, when the URL is not an Amazon host.
    pub endpoint: Option<String>,
}

impl BucketUrl {
    /// Parses a bucket URL.
    pub fn parse(raw: &str) -> DeployResult<Self> {
        let url = Url::parse(raw)
            .map_err(|e| DeployError::Config(format!("invalid bucket URL {raw}: {e}")))?;
        let host = url
            .host_str()
            .ok_or_else(|| DeployError::Config(format!("bucket URL {raw} has no host")))?;

        if host.ends_with(".amazonaws.com") {
            let labels: Vec<&str> = host.split('.').collect();
            let first = labels[0];

            if first != "s3" && !first.starts_with("s3-") {
                // Virtual-hosted style: bucket.s3-{region} or
                // bucket.s3.{region}.
                return Ok(Self {
                    bucket: first.to_owned(),
                    region: region_from_labels(&labels),
                    endpoint: None,
                });
            }

            // Path style on an Amazon host: s3.{region}/bucket.
            let bucket = first_path_segment(&url).ok_or_else(|| {
                DeployError::Config(format!("bucket URL {raw} has no bucket name"))
            })?;
            return Ok(Self {
                bucket,
                region: region_from_labels(&labels),
                endpoint: None,
            });
        }

        // Custom endpoint, path style.
        let bucket = first_path_segment(&url)
            .ok_or_else(|| DeployError::Config(format!("bucket URL {raw} has no bucket name")))?;
        let mut endpoint = format!("{}://{}", url.scheme(), host);
        if let Some(port) = url.port() {
            endpoint.push_str(&format!(":{port}"));
        }
        Ok(Self {
            bucket,
            region: None,
            endpoint: Some(endpoint),
        })
    }
}

/// Pulls the region out of an Amazon host's labels, handling both the
/// `s3-{region}` and `s3.{region}` conventions.
fn region_from_labels(labels: &[&str]) -> Option<String> {
    for (i, label) in labels.iter().enumerate() {
        if let Some(region) = label.strip_prefix("s3-") {
            return Some(region.to_owned());
        }
        if *label == "s3" {
            return labels
                .get(i + 1)
                .filter(|next| **next != "amazonaws")
                .map(|next| (*next).to_owned());
        }
    }
    None
}

fn first_path_segment(url: &Url) -> Option<String> {
    url.path_segments()
        .and_then(|mut segments| segments.next())
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

/// Bundle storage backed by an [`ObjectStore`].
pub struct ObjectBundleStore {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl ObjectBundleStore {
    /// Opens the bucket named by `bucket_url`, signing with the given
    /// credentials. `fallback_region` is used when the URL does not name
    /// a region.
    pub fn open(
        bucket_url: &BucketUrl,
        credentials: &Credentials,
        fallback_region: &str,
    ) -> DeployResult<Self> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&bucket_url.bucket)
            .with_access_key_id(credentials.access_key_id())
            .with_secret_access_key(credentials.secret_access_key().expose_secret())
            .with_region(bucket_url.region.as_deref().unwrap_or(fallback_region));

        if let Some(endpoint) = &bucket_url.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }

        let store = builder.build().map_err(|e| {
            DeployError::Config(format!("failed to open bucket {}: {e}", bucket_url.bucket))
        })?;

        Ok(Self {
            store: Arc::new(store),
            bucket: bucket_url.bucket.clone(),
        })
    }

    /// Creates a store over a pre-configured object store.
    #[must_use]
    pub fn with_store(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }
}

#[async_trait::async_trait]
impl BundleStore for ObjectBundleStore {
    fn container(&self) -> &str {
        &self.bucket
    }

    async fn exists(&self, key: &str) -> DeployResult<bool> {
        let path = ObjectPath::from(key);
        match self.store.head(&path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(source) => Err(DeployError::Probe {
                key: key.to_owned(),
                source,
            }),
        }
    }

    async fn put(&self, key: &str, data: Bytes) -> DeployResult<()> {
        let path = ObjectPath::from(key);
        debug!(key = %key, size = data.len(), "writing bundle");
        self.store
            .put(&path, data.into())
            .await
            .map_err(|e| DeployError::transfer(key, e))?;
        Ok(())
    }

    async fn put_stream(&self, key: &str, source: &mut BundleStream) -> DeployResult<u64> {
        let path = ObjectPath::from(key);
        let mut writer = BufWriter::new(self.store.clone(), path);
        let mut bytes_written = 0u64;

        loop {
            let chunk = match source.next_chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    writer.abort().await.ok();
                    return Err(DeployError::bundle(e));
                }
            };
            bytes_written += chunk.len() as u64;
            if let Err(e) = writer.write_all(&chunk).await {
                writer.abort().await.ok();
                return Err(DeployError::transfer(key, e));
            }
        }

        writer
            .shutdown()
            .await
            .map_err(|e| DeployError::transfer(key, e))?;
        debug!(key = %key, size = bytes_written, "bundle written");
        Ok(bytes_written)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use super::*;

    /// In-test store with a scripted set of taken keys and an optional
    /// probe failure.
    #[derive(Default)]
    pub(crate) struct FakeStore {
        taken: Mutex<HashSet<String>>,
        probes: Mutex<Vec<String>>,
        puts: Mutex<Vec<(String, u64)>>,
        fail_probe_at: Option<String>,
    }

    impl FakeStore {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn with_taken<I, S>(keys: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            let store = Self::new();
            store
                .taken
                .lock()
                .unwrap()
                .extend(keys.into_iter().map(Into::into));
            store
        }

        pub(crate) fn with_probe_error(mut self, key: impl Into<String>) -> Self {
            self.fail_probe_at = Some(key.into());
            self
        }

        pub(crate) fn recorded_probes(&self) -> Vec<String> {
            self.probes.lock().unwrap().clone()
        }

        pub(crate) fn recorded_puts(&self) -> Vec<(String, u64)> {
            self.puts.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl BundleStore for FakeStore {
        fn container(&self) -> &str {
            "fake-bucket"
        }

        async fn exists(&self, key: &str) -> DeployResult<bool> {
            self.probes.lock().unwrap().push(key.to_owned());
            if self.fail_probe_at.as_deref() == Some(key) {
                return Err(DeployError::Probe {
                    key: key.to_owned(),
                    source: object_store::Error::Generic {
                        store: "fake",
                        source: "injected probe failure".into(),
                    },
                });
            }
            Ok(self.taken.lock().unwrap().contains(key))
        }

        async fn put(&self, key: &str, data: Bytes) -> DeployResult<()> {
            self.taken.lock().unwrap().insert(key.to_owned());
            self.puts.lock().unwrap().push((key.to_owned(), data.len() as u64));
            Ok(())
        }

        async fn put_stream(&self, key: &str, source: &mut BundleStream) -> DeployResult<u64> {
            let mut bytes_written = 0u64;
            while let Some(chunk) = source.next_chunk().await.map_err(DeployError::bundle)? {
                bytes_written += chunk.len() as u64;
            }
            self.taken.lock().unwrap().insert(key.to_owned());
            self.puts.lock().unwrap().push((key.to_owned(), bytes_written));
            Ok(bytes_written)
        }
    }
}

#[cfg(test)]
mod tests {
    use object_store::memory::InMemory;

    use super::*;

    #[test]
    fn parses_virtual_hosted_url_with_dashed_region() {
        let bucket = BucketUrl::parse("https://eb-bundle-myapp.s3-us-west-2.amazonaws.com").unwrap();
        assert_eq!(
            bucket,
            BucketUrl {
                bucket: "eb-bundle-myapp".to_owned(),
                region: Some("us-west-2".to_owned()),
                endpoint: None,
            }
        );
    }

    #[test]
    fn parses_virtual_hosted_url_with_dotted_region() {
        let bucket = BucketUrl::parse("https://bundles.s3.eu-central-1.amazonaws.com").unwrap();
        assert_eq!(
            bucket,
            BucketUrl {
                bucket: "bundles".to_owned(),
                region: Some("eu-central-1".to_owned()),
                endpoint: None,
            }
        );
    }

    #[test]
    fn parses_path_style_amazon_url() {
        let bucket = BucketUrl::parse("https://s3.us-east-1.amazonaws.com/my-bundles").unwrap();
        assert_eq!(
            bucket,
            BucketUrl {
                bucket: "my-bundles".to_owned(),
                region: Some("us-east-1".to_owned()),
                endpoint: None,
            }
        );
    }

    #[test]
    fn parses_custom_endpoint_url() {
        let bucket = BucketUrl::parse("http://localhost:9000/test-bucket").unwrap();
        assert_eq!(
            bucket,
            BucketUrl {
                bucket: "test-bucket".to_owned(),
                region: None,
                endpoint: Some("http://localhost:9000".to_owned()),
            }
        );
    }

    #[test]
    fn rejects_unusable_urls() {
        assert!(BucketUrl::parse("not a url").is_err());
        assert!(BucketUrl::parse("http://localhost:9000/").is_err());
    }

    #[tokio::test]
    async fn exists_distinguishes_missing_objects() {
        let memory = Arc::new(InMemory::new());
        let store = ObjectBundleStore::with_store(memory, "bundles");

        assert!(!store.exists("app-0.zip").await.unwrap());
        store.put("app-0.zip", Bytes::from_static(b"zip")).await.unwrap();
        assert!(store.exists("app-0.zip").await.unwrap());
    }

    #[tokio::test]
    async fn put_stream_writes_all_chunks() {
        let memory: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        let store = ObjectBundleStore::with_store(memory.clone(), "bundles");

        let data = vec![3u8; 150_000];
        let mut stream = BundleStream::from_reader(std::io::Cursor::new(data.clone()));
        let written = store.put_stream("app-0.zip", &mut stream).await.unwrap();
        assert_eq!(written, data.len() as u64);

        let stored = memory
            .get(&ObjectPath::from("app-0.zip"))
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();
        assert_eq!(stored.len(), data.len());
    }
}
