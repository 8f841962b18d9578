//! R-Droid Router command-line entry point
//!
//! Loads the router configuration, installs logging and runs one command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use r_droid_core::{RouterConfig, APP_NAME, VERSION};
use r_droid_router::commands::{GrantsCommand, InspectCommand, MimeCommand, ResolveCommand};

#[derive(Parser)]
#[command(name = "r-droid-router")]
#[command(about = "Intent resolution and URI permission tooling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve an intent URI against one or more manifests
    Resolve {
        /// AndroidManifest.xml files to install
        #[arg(short, long = "manifest", required = true)]
        manifests: Vec<PathBuf>,

        /// Intent URI (plain, intent: or android-app: form)
        intent_uri: String,

        /// List every matching handler instead of resolving one
        #[arg(long)]
        all: bool,

        /// Explicit MIME type for the descriptor
        #[arg(long = "type")]
        mime_type: Option<String>,

        /// Do not require the DEFAULT category
        #[arg(long)]
        any_category: bool,
    },

    /// Print the parsed form of an intent URI
    Inspect {
        intent_uri: String,
    },

    /// Normalize MIME types
    Mime {
        #[arg(required = true)]
        types: Vec<String>,
    },

    /// List persisted URI grants
    Grants {
        /// Only grants held by this uid
        #[arg(long)]
        uid: Option<u32>,

        /// Grant store file (defaults to the configured store)
        #[arg(long)]
        store: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RouterConfig::load_from(path).await?,
        None => RouterConfig::load().await?,
    };

    let default_level = if cli.verbose { "debug" } else { config.logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!("{} v{} starting...", APP_NAME, VERSION);

    let output = match cli.command {
        Commands::Resolve {
            manifests,
            intent_uri,
            all,
            mime_type,
            any_category,
        } => {
            let mut resolver = config.resolver.clone();
            if any_category {
                resolver.default_only = false;
            }
            ResolveCommand {
                manifests,
                intent_uri,
                mime_type,
                all,
                resolver,
            }
            .execute()
            .await?
        }
        Commands::Inspect { intent_uri } => InspectCommand { intent_uri }.execute()?,
        Commands::Mime { types } => MimeCommand { types }.execute()?,
        Commands::Grants { uid, store } => {
            let store_path = match store {
                Some(path) => path,
                None => config
                    .permissions
                    .resolved_store_path()
                    .context("No grant store path configured")?,
            };
            GrantsCommand { store_path, uid }.execute()?
        }
    };

    print!("{}", output);
    Ok(())
}
