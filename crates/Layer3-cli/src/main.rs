//! CloudSave CLI - Main entry point

mod commands;

use clap::{Parser, Subcommand};
use cloudsave_core::CloudSaves;
use cloudsave_foundation::ConfigStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CloudSave - git-backed save slots for a data directory
#[derive(Parser, Debug)]
#[command(name = "cloudsave")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Config file (default: ~/.config/cloudsave/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory under version control (default: current directory)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show or change the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Connect the data directory to the configured repository
    Authorize {
        /// Branch to use instead of the configured one
        #[arg(short, long)]
        branch: Option<String>,
    },
    /// Initialize the repository
    Init {
        /// Delete the existing history and start over
        #[arg(short, long)]
        force: bool,
    },
    /// List saves, newest first
    List,
    /// Create a save from the current data
    Create {
        name: String,
        #[arg(short = 'm', long)]
        description: Option<String>,
    },
    /// Restore a save into the data directory
    Load { tag: String },
    /// Delete a save locally and remotely
    Delete { tag: String },
    /// Rename a save or change its description
    Rename {
        tag: String,
        name: String,
        #[arg(short = 'm', long)]
        description: Option<String>,
    },
    /// Replace a save's contents with the current data
    Overwrite { tag: String },
    /// Files changed between two refs
    Diff { from: String, to: String },
    /// Working tree and save pointers
    Status,
    /// Manage the stash taken before a load
    Stash {
        #[command(subcommand)]
        action: StashAction,
    },
    /// Run the auto-save timer until Ctrl-C
    Autosave,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the configuration (token hidden)
    Show,
    /// Update configuration fields
    Set {
        #[arg(long)]
        repo_url: Option<String>,
        #[arg(long)]
        token: Option<String>,
        #[arg(long)]
        display_name: Option<String>,
        #[arg(long)]
        branch: Option<String>,
        /// Enable or disable auto-save
        #[arg(long)]
        auto_save: Option<bool>,
        /// Auto-save interval in minutes
        #[arg(long)]
        interval: Option<f64>,
        /// Save tag auto-save overwrites
        #[arg(long)]
        target: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum StashAction {
    /// Whether a stash is pending
    Check,
    /// Apply the stash and drop it
    Apply,
    /// Drop the stash without applying it
    Discard,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = match &args.config {
        Some(path) => ConfigStore::at_path(path),
        None => ConfigStore::global()?,
    };
    let data_dir = match args.data_dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    tracing::debug!(
        "Data directory {}, config {}",
        data_dir.display(),
        config.path().display()
    );

    let saves = CloudSaves::new(data_dir, Arc::new(config));
    commands::run(&saves, args.command, args.json).await
}
