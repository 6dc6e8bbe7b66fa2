//! Status command - show the target environment.

use thiserror::Error;

use sprout_api::{ApiClient, ApiConfig, ApiError, DescribeEnvironmentsParams};

use crate::defaults::{self, DefaultsError, Target};

#[derive(Error, Debug)]
pub enum StatusError {
    #[error(transparent)]
    Defaults(#[from] DefaultsError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Environment {0} not found")]
    NotFound(String),
}

pub async fn run(target: Target) -> Result<(), StatusError> {
    let resolved = defaults::resolve(&target)?;
    let environment = defaults::require(resolved.environment, "env")?;

    let api = ApiClient::new(ApiConfig::from_env()?)?;
    let params = DescribeEnvironmentsParams {
        application_name: resolved.application,
        environment_names: vec![environment.clone()],
        include_deleted: false,
    };

    let environments = api.describe_environments(&params).await?;
    if environments.is_empty() {
        return Err(StatusError::NotFound(environment));
    }

    for env in &environments {
        println!(
            "Environment {} ({})",
            env.environment_name, env.environment_id
        );
        println!("  Application: {}", env.application_name);
        println!("  Status: {}", env.status);
        println!("  Health: {}", env.health);
        println!("  Version: {}", env.version_label);
        if !env.cname.is_empty() {
            println!("  CNAME: {}", env.cname);
        }
        println!("  Updated: {}", env.date_updated.to_rfc3339());
    }
    Ok(())
}
