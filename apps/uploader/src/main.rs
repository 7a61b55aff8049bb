//! chunkrelay uploader entry point.

mod app;
mod config;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Uploads a file to a chunk receiver, resuming interrupted uploads.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Config file (defaults to ~/.config/chunkrelay/uploader.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Storage name from the config file
    #[arg(short, long)]
    storage: Option<String>,

    /// Source file, or `-` for stdin
    source: String,

    /// Destination path under the storage base path (defaults to the
    /// source file name)
    destination: Option<String>,

    /// Total size in bytes when reading stdin; enables resume ids
    #[arg(long)]
    size: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = config::Config::load(args.config.as_deref())?;
    let storage = config.storage(args.storage.as_deref())?.clone();
    tracing::info!(storage = %storage.name, "configuration loaded");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(args, storage))
}
