//! Sprout CLI - bundle, upload and deploy application versions.

mod commands;
mod defaults;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use defaults::Target;

#[derive(Parser)]
#[command(name = "sprout")]
#[command(about = "Bundle, upload and deploy application versions")]
#[command(version)]
struct Cli {
    /// Source directory to operate on
    #[arg(short, long, default_value = ".", global = true)]
    dir: PathBuf,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by the commands that talk to the platform. Anything
/// left unset falls back to `sprout.toml` and derived defaults.
#[derive(Args)]
struct TargetArgs {
    /// Application name (overrides sprout.toml)
    #[arg(short, long)]
    app: Option<String>,

    /// Environment name (overrides sprout.toml)
    #[arg(short, long)]
    env: Option<String>,

    /// Bucket URL bundles are uploaded to (overrides sprout.toml)
    #[arg(short, long)]
    bucket: Option<String>,

    /// Version label base (overrides sprout.toml)
    #[arg(short, long)]
    label: Option<String>,
}

impl TargetArgs {
    fn into_target(self, dir: PathBuf) -> Target {
        Target {
            dir,
            application: self.app,
            environment: self.env,
            bucket: self.bucket,
            label: self.label,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write the zip bundle to a local file without uploading
    Bundle {
        /// Output file
        #[arg(short, long, default_value = "sprout-bundle.zip")]
        out: PathBuf,
    },

    /// Bundle the tree and register it as a new application version
    Upload {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Bundle, upload and point the environment at the new version
    Deploy {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Show the target environment
    Status {
        #[command(flatten)]
        target: TargetArgs,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    let result: Result<(), anyhow::Error> = match cli.command {
        Commands::Bundle { out } => commands::bundle::run(&cli.dir, &out)
            .await
            .map_err(Into::into),
        Commands::Upload { target } => commands::upload::run(target.into_target(cli.dir))
            .await
            .map_err(Into::into),
        Commands::Deploy { target } => commands::deploy::run(target.into_target(cli.dir))
            .await
            .map_err(Into::into),
        Commands::Status { target } => commands::status::run(target.into_target(cli.dir))
            .await
            .map_err(Into::into),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
