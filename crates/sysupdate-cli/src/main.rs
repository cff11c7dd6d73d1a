use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sysupdate_catalog::Filter;

mod commands;
mod config;

use commands::Context;
use config::SysupdateConfig;

#[derive(Parser)]
#[command(
    name = "sysupdatectl",
    about = "Inspect and edit the system update catalog",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to sysupdate.toml (default: ./sysupdate.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Override the catalog database path
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,
    /// View to show: all, pending, pending_clicks, pending_image,
    /// installed, installed_clicks
    #[arg(short, long, global = true)]
    filter: Option<Filter>,
    /// Print rows and edit scripts as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the rows of the selected view
    List,
    /// Upsert records from a JSON file (one object or an array)
    Add { file: PathBuf },
    /// Delete a record
    Remove {
        identifier: String,
        revision: u32,
    },
    /// Record a device image update for a channel
    Image {
        channel: String,
        /// Numeric image version, used as the revision
        version: String,
        /// Download size in bytes
        size: u64,
        /// The update was fetched without user interaction
        #[arg(long)]
        automatic: bool,
    },
    /// Mark a record as installed
    Installed {
        identifier: String,
        revision: u32,
    },
    /// Delete installed records older than the given age
    Prune {
        /// Age in seconds
        #[arg(long)]
        older_than: u64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = SysupdateConfig::load(cli.config.as_deref())?;
    if let Some(path) = cli.catalog {
        config.catalog.path = path;
        config.catalog.in_memory = false;
    }
    if let Some(filter) = cli.filter {
        config.view.filter = filter;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.log.filter))?,
        )
        .with_writer(std::io::stderr)
        .init();

    let ctx = Context {
        config,
        json: cli.json,
    };

    match cli.command {
        Commands::List => commands::catalog::list(&ctx),
        Commands::Add { file } => commands::catalog::add(&ctx, &file),
        Commands::Remove {
            identifier,
            revision,
        } => commands::catalog::remove(&ctx, &identifier, revision),
        Commands::Image {
            channel,
            version,
            size,
            automatic,
        } => commands::catalog::image(&ctx, &channel, &version, size, automatic),
        Commands::Installed {
            identifier,
            revision,
        } => commands::catalog::installed(&ctx, &identifier, revision),
        Commands::Prune { older_than } => commands::catalog::prune(&ctx, older_than),
    }
}
