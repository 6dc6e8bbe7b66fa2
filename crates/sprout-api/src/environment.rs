//! Environment operations.

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;

use crate::client::ApiClient;
use crate::error::ApiResult;
use crate::params::Params;

/// Option namespace holding environment variables.
const ENV_VAR_NAMESPACE: &str = "aws:elasticbeanstalk:application:environment";

/// Inputs for `UpdateEnvironment`.
#[derive(Debug, Clone, Default)]
pub struct UpdateEnvironmentParams {
    /// Environment to update.
    pub environment_name: String,
    /// Version label to deploy. Omitted from the request when absent so
    /// the environment keeps its current version.
    pub version_label: Option<String>,
    /// Configuration options to apply alongside the version change.
    pub option_settings: Vec<ConfigurationOptionSetting>,
}

impl UpdateEnvironmentParams {
    /// Appends an environment variable to the option settings.
    pub fn add_env(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.option_settings.push(ConfigurationOptionSetting {
            namespace: ENV_VAR_NAMESPACE.to_owned(),
            option_name: name.into(),
            value: value.into(),
        });
    }

    fn to_params(&self) -> Params {
        let mut params = Params::new();
        params.push("EnvironmentName", self.environment_name.as_str());
        params.push_opt("VersionLabel", self.version_label.as_deref());
        for (i, setting) in self.option_settings.iter().enumerate() {
            let index = i + 1;
            params.push_member("OptionSettings", index, "Namespace", setting.namespace.as_str());
            params.push_member("OptionSettings", index, "OptionName", setting.option_name.as_str());
            params.push_member("OptionSettings", index, "Value", setting.value.as_str());
        }
        params
    }
}

/// A single configuration option value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationOptionSetting {
    pub namespace: String,
    pub option_name: String,
    pub value: String,
}

/// Inputs for `DescribeEnvironments`.
#[derive(Debug, Clone, Default)]
pub struct DescribeEnvironmentsParams {
    /// Restrict results to one application.
    pub application_name: Option<String>,
    /// Restrict results to specific environment names.
    pub environment_names: Vec<String>,
    /// Include environments deleted in the last hour.
    pub include_deleted: bool,
}

impl DescribeEnvironmentsParams {
    fn to_params(&self) -> Params {
        let mut params = Params::new();
        params.push_opt("ApplicationName", self.application_name.as_deref());
        params.push_member_list(
            "EnvironmentNames",
            self.environment_names.iter().map(String::as_str),
        );
        if self.include_deleted {
            params.push("IncludeDeleted", "true");
        }
        params
    }
}

/// Description of an existing environment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EnvironmentDescription {
    #[serde(default)]
    pub application_name: String,
    #[serde(rename = "CNAME", default)]
    pub cname: String,
    /// Environment dates travel as ISO 8601 strings, unlike the epoch
    /// floats on version records.
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "EndpointURL", default)]
    pub endpoint_url: String,
    #[serde(default)]
    pub environment_id: String,
    #[serde(default)]
    pub environment_name: String,
    #[serde(default)]
    pub health: String,
    #[serde(default)]
    pub solution_stack_name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub template_name: String,
    #[serde(default)]
    pub tier: EnvironmentTier,
    #[serde(default)]
    pub version_label: String,
}

/// Tier of an environment, for example a web server tier.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct EnvironmentTier {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "Type", default)]
    pub tier_type: String,
    #[serde(default)]
    pub version: String,
}

impl ApiClient {
    /// Points an environment at a different application version and
    /// applies any option settings.
    pub async fn update_environment(&self, params: &UpdateEnvironmentParams) -> ApiResult<()> {
        self.execute(Method::POST, "UpdateEnvironment", &params.to_params())
            .await
    }

    /// Fetches descriptions for matching environments.
    pub async fn describe_environments(
        &self,
        params: &DescribeEnvironmentsParams,
    ) -> ApiResult<Vec<EnvironmentDescription>> {
        #[derive(Deserialize)]
        struct Wrapper {
            #[serde(rename = "Environments", default)]
            environments: Vec<EnvironmentDescription>,
        }

        let wrapper: Wrapper = self
            .execute_decoded(Method::GET, "DescribeEnvironments", &params.to_params())
            .await?;
        Ok(wrapper.environments)
    }
}
