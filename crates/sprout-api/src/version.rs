//! Application version operations.

use reqwest::Method;
use serde::Deserialize;

use crate::client::ApiClient;
use crate::error::ApiResult;
use crate::params::Params;
use crate::timestamp::EpochSeconds;

/// Inputs for `CreateApplicationVersion`.
#[derive(Debug, Clone, Default)]
pub struct CreateApplicationVersionParams {
    /// Application the version belongs to.
    pub application_name: String,
    /// Label the new version is registered under.
    pub version_label: String,
    /// Free-form description. Sent as a placeholder when absent because
    /// the service rejects requests without one.
    pub description: Option<String>,
    /// Location of the uploaded bundle backing this version.
    pub source_bundle: Option<SourceBundle>,
}

impl CreateApplicationVersionParams {
    fn to_params(&self) -> Params {
        let mut params = Params::new();
        params.push("ApplicationName", self.application_name.as_str());
        params.push("VersionLabel", self.version_label.as_str());
        params.push("Description", self.description.as_deref().unwrap_or("_"));
        if let Some(bundle) = &self.source_bundle {
            params.push("SourceBundle.S3Bucket", bundle.s3_bucket.as_str());
            params.push("SourceBundle.S3Key", bundle.s3_key.as_str());
        }
        params
    }
}

/// Bucket and key of an uploaded source bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBundle {
    pub s3_bucket: String,
    pub s3_key: String,
}

/// Inputs for `DescribeApplicationVersions`.
#[derive(Debug, Clone, Default)]
pub struct DescribeApplicationVersionsParams {
    /// Restrict results to one application.
    pub application_name: Option<String>,
    /// Restrict results to specific version labels.
    pub version_labels: Vec<String>,
}

impl DescribeApplicationVersionsParams {
    fn to_params(&self) -> Params {
        let mut params = Params::new();
        params.push_opt("ApplicationName", self.application_name.as_deref());
        params.push_member_list(
            "VersionLabels",
            self.version_labels.iter().map(String::as_str),
        );
        params
    }
}

/// One application version record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApplicationVersionDescription {
    #[serde(default)]
    pub application_name: String,
    #[serde(default)]
    pub version_label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: String,
    /// Dates travel as epoch-seconds floats on version records.
    pub date_created: Option<EpochSeconds>,
    pub date_updated: Option<EpochSeconds>,
    pub source_bundle: Option<S3Location>,
}

/// Bundle location attached to a version record.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct S3Location {
    #[serde(default)]
    pub s3_bucket: String,
    #[serde(default)]
    pub s3_key: String,
}

impl ApiClient {
    /// Registers an uploaded bundle as a new application version.
    pub async fn create_application_version(
        &self,
        params: &CreateApplicationVersionParams,
    ) -> ApiResult<()> {
        self.execute(Method::POST, "CreateApplicationVersion", &params.to_params())
            .await
    }

    /// Fetches version records for an application.
    pub async fn describe_application_versions(
        &self,
        params: &DescribeApplicationVersionsParams,
    ) -> ApiResult<Vec<ApplicationVersionDescription>> {
        #[derive(Deserialize)]
        struct Wrapper {
            #[serde(rename = "ApplicationVersions", default)]
            application_versions: Vec<ApplicationVersionDescription>,
        }

        let wrapper: Wrapper = self
            .execute_decoded(
                Method::GET,
                "DescribeApplicationVersions",
                &params.to_params(),
            )
            .await?;
        Ok(wrapper.application_versions)
    }
}
