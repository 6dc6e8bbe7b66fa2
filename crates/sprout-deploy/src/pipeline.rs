//! Core deployment pipeline logic.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use sprout_api::{
    ApiClient, ApiResult, CreateApplicationVersionParams, SourceBundle, UpdateEnvironmentParams,
};

use crate::bundle::{ArchiveProducer, BundleStream, ZipCommandProducer};
use crate::error::{DeployError, DeployResult, DeployStage};
use crate::namer;
use crate::request::DeployRequest;
use crate::state::{
    DeployOutcome, Naming, RegisteredVersion, RegisteringVersion, Run, UpdatingEnvironment,
    Uploading,
};
use crate::store::BundleStore;

/// The platform calls the pipeline makes.
///
/// [`ApiClient`] is the production implementation. Tests substitute a
/// recording fake so the pipeline can run without a server.
#[async_trait::async_trait]
pub trait PlatformApi: Send + Sync {
    /// Registers an uploaded bundle as an application version.
    async fn create_application_version(
        &self,
        params: &CreateApplicationVersionParams,
    ) -> ApiResult<()>;

    /// Points an environment at a version.
    async fn update_environment(&self, params: &UpdateEnvironmentParams) -> ApiResult<()>;
}

#[async_trait::async_trait]
impl PlatformApi for ApiClient {
    async fn create_application_version(
        &self,
        params: &CreateApplicationVersionParams,
    ) -> ApiResult<()> {
        ApiClient::create_application_version(self, params).await
    }

    async fn update_environment(&self, params: &UpdateEnvironmentParams) -> ApiResult<()> {
        ApiClient::update_environment(self, params).await
    }
}

/// Orchestrates the bundle, upload, register and update steps.
///
/// The pipeline is forward-only. A failed step leaves everything the
/// earlier steps created in place: an uploaded bundle stays in the
/// bucket and a registered version stays registered. Rerunning after a
/// failure allocates a fresh label instead of reusing a half-finished
/// one.
pub struct Deployer {
    store: Arc<dyn BundleStore>,
    api: Arc<dyn PlatformApi>,
    producer: Arc<dyn ArchiveProducer>,
    cancel: CancellationToken,
}

impl Deployer {
    /// Creates a deployer that bundles with the external `zip` command.
    pub fn new(store: Arc<dyn BundleStore>, api: Arc<dyn PlatformApi>) -> Self {
        Self {
            store,
            api,
            producer: Arc::new(ZipCommandProducer::default()),
            cancel: CancellationToken::new(),
        }
    }

    /// Replaces the archive producer.
    #[must_use]
    pub fn with_producer(mut self, producer: Arc<dyn ArchiveProducer>) -> Self {
        self.producer = producer;
        self
    }

    /// Aborts between steps once `cancel` is triggered. A step that has
    /// already started runs to completion first.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Deploys a source tree to an environment.
    ///
    /// The full pipeline:
    /// 1. Allocate a free version label in the bucket
    /// 2. Produce the zip bundle and stream it to the bucket
    /// 3. Register the bundle as an application version
    /// 4. Point the environment at the new version
    pub async fn deploy(&self, request: DeployRequest) -> DeployResult<DeployOutcome> {
        request.validate()?;

        let mut stream = self.producer.produce(&request.source_dir).await?;
        let run = self.allocate_label(request).await?;
        let run = self.upload_bundle(run, &mut stream).await?;
        let run = self.register_version(run).await?;
        let run = self.update_environment(run).await?;

        let outcome = run.updated();
        info!(
            environment = %outcome.environment,
            version = %outcome.version.full_label,
            "environment update initiated"
        );
        Ok(outcome)
    }

    /// Uploads an already-produced bundle and registers it as an
    /// application version, without touching any environment.
    pub async fn upload(
        &self,
        request: DeployRequest,
        stream: &mut BundleStream,
    ) -> DeployResult<RegisteredVersion> {
        request.validate_upload()?;

        let run = self.allocate_label(request).await?;
        let run = self.upload_bundle(run, stream).await?;
        let run = self.register_version(run).await?;
        Ok(run.into_version())
    }

    async fn allocate_label(&self, request: DeployRequest) -> DeployResult<Run<Uploading>> {
        let run = Run::<Naming>::start(request);
        let label = namer::allocate(self.store.as_ref(), &run.request().label_base, &self.cancel)
            .await?;

        info!(
            label = %label.full_label,
            container = %self.store.container(),
            "allocated version label"
        );
        Ok(run.named(label))
    }

    async fn upload_bundle(
        &self,
        run: Run<Uploading>,
        stream: &mut BundleStream,
    ) -> DeployResult<Run<RegisteringVersion>> {
        self.check_cancelled(DeployStage::Uploading)?;

        let bytes_sent = self.store.put_stream(run.object_key(), stream).await?;
        info!(
            key = %run.object_key(),
            bytes = bytes_sent,
            "bundle uploaded"
        );
        Ok(run.uploaded(bytes_sent))
    }

    async fn register_version(
        &self,
        run: Run<RegisteringVersion>,
    ) -> DeployResult<Run<UpdatingEnvironment>> {
        self.check_cancelled(DeployStage::RegisteringVersion)?;

        let params = CreateApplicationVersionParams {
            application_name: run.request().application_name.clone(),
            version_label: run.full_label().to_owned(),
            description: None,
            source_bundle: Some(SourceBundle {
                s3_bucket: self.store.container().to_owned(),
                s3_key: run.object_key().to_owned(),
            }),
        };

        self.api
            .create_application_version(&params)
            .await
            .map_err(|source| DeployError::Api {
                stage: DeployStage::RegisteringVersion,
                source,
            })?;

        info!(label = %run.full_label(), "application version registered");
        Ok(run.registered())
    }

    async fn update_environment(
        &self,
        run: Run<UpdatingEnvironment>,
    ) -> DeployResult<Run<UpdatingEnvironment>> {
        self.check_cancelled(DeployStage::UpdatingEnvironment)?;

        let params = UpdateEnvironmentParams {
            environment_name: run.request().environment_name.clone(),
            version_label: Some(run.full_label().to_owned()),
            ..UpdateEnvironmentParams::default()
        };

        self.api
            .update_environment(&params)
            .await
            .map_err(|source| DeployError::Api {
                stage: DeployStage::UpdatingEnvironment,
                source,
            })?;

        Ok(run)
    }

    fn check_cancelled(&self, stage: DeployStage) -> DeployResult<()> {
        if self.cancel.is_cancelled() {
            return Err(DeployError::Cancelled { stage });
        }
        Ok(())
    }
}

impl std::fmt::Debug for Deployer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deployer").finish_non_exhaustive()
    }
}
