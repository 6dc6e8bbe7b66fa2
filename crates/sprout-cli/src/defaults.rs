//! Project defaults from `sprout.toml` and the source tree.
//!
//! Values resolve in precedence order: command-line flag, then the
//! `[branch.<name>]` table for the current git branch, then the
//! `[defaults]` table, then a derived default where one exists.
//!
//! ```toml
//! [defaults]
//! app = "storefront"
//! env = "storefront-live"
//! region = "eu-west-1"
//!
//! [branch.staging]
//! env = "storefront-staging"
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Name of the per-project defaults file.
pub const CONFIG_FILE: &str = "sprout.toml";

#[derive(Error, Debug)]
pub enum DefaultsError {
    #[error("Cannot access {}: {source}", dir.display())]
    Dir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read sprout.toml: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse sprout.toml: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("No {0} configured: pass --{0} or set it in sprout.toml")]
    Missing(&'static str),
}

/// What the user asked for on the command line.
#[derive(Debug, Clone)]
pub struct Target {
    pub dir: PathBuf,
    pub application: Option<String>,
    pub environment: Option<String>,
    pub bucket: Option<String>,
    pub label: Option<String>,
}

/// One table of defaults, either global or per-branch.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefaultsTable {
    pub app: Option<String>,
    pub env: Option<String>,
    pub bucket: Option<String>,
    pub label: Option<String>,
    pub region: Option<String>,
}

/// Layout of `sprout.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub defaults: DefaultsTable,
    #[serde(default)]
    pub branch: HashMap<String, DefaultsTable>,
}

/// Fully resolved values for one invocation. Fields stay `None` when
/// no flag, table or derivation produced a value; commands require the
/// ones they need.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolved {
    pub application: Option<String>,
    pub environment: Option<String>,
    pub bucket: Option<String>,
    pub label: Option<String>,
}

/// Resolves the target against `sprout.toml`, the current git branch
/// and the `AWS_REGION` environment variable.
pub fn resolve(target: &Target) -> Result<Resolved, DefaultsError> {
    let dir = target
        .dir
        .canonicalize()
        .map_err(|source| DefaultsError::Dir {
            dir: target.dir.clone(),
            source,
        })?;

    let file = load(&dir)?;
    let branch = current_branch(&dir);
    if let Some(branch) = &branch {
        debug!(branch = %branch, "resolving branch defaults");
    }
    let env_region = std::env::var("AWS_REGION").ok();

    let canonical = Target {
        dir,
        ..target.clone()
    };
    Ok(compose(
        &canonical,
        &file,
        branch.as_deref(),
        env_region.as_deref(),
    ))
}

/// Unwraps a resolved value or reports which flag would set it.
pub fn require(value: Option<String>, what: &'static str) -> Result<String, DefaultsError> {
    value.ok_or(DefaultsError::Missing(what))
}

fn load(dir: &Path) -> Result<ConfigFile, DefaultsError> {
    let path = dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(ConfigFile::default());
    }
    let content = std::fs::read_to_string(&path)?;
    Ok(toml::from_str(&content)?)
}

fn current_branch(dir: &Path) -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--abbrev-ref", "HEAD"])
        .current_dir(dir)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let branch = String::from_utf8_lossy(&output.stdout).trim().to_owned();
    if branch.is_empty() {
        None
    } else {
        Some(branch)
    }
}

fn compose(
    flags: &Target,
    file: &ConfigFile,
    branch: Option<&str>,
    env_region: Option<&str>,
) -> Resolved {
    let branch_table = branch.and_then(|name| file.branch.get(name));
    let pick = |flag: &Option<String>, get: fn(&DefaultsTable) -> &Option<String>| {
        flag.clone()
            .or_else(|| branch_table.and_then(|table| get(table).clone()))
            .or_else(|| get(&file.defaults).clone())
    };

    let basename = flags
        .dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());

    let application = pick(&flags.application, |t| &t.app).or_else(|| basename.clone());
    let environment = pick(&flags.environment, |t| &t.env);
    let label = pick(&flags.label, |t| &t.label).or(basename);

    let region = branch_table
        .and_then(|table| table.region.clone())
        .or_else(|| file.defaults.region.clone())
        .or_else(|| env_region.map(str::to_owned));

    // The bucket default needs both an application and a region; with
    // either missing the bucket has to be configured explicitly.
    let bucket = pick(&flags.bucket, |t| &t.bucket).or_else(|| match (&application, &region) {
        (Some(app), Some(region)) => {
            Some(format!("https://{app}-bundles.s3.{region}.amazonaws.com"))
        }
        _ => None,
    });

    Resolved {
        application,
        environment,
        bucket,
        label,
    }
}
