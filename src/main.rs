mod commands;

use anyhow::Result;
use clap::Parser;
use slicedl::config::{DEFAULT_BLOCK_COUNT, DEFAULT_BUFFER_SIZE};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// URL of the resource; the server must accept byte ranges
    #[arg(index = 1)]
    pub url: String,

    /// Output file (defaults to the last segment of the URL path)
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Number of slices downloaded in parallel
    #[arg(short = 'b', long = "blocks", default_value_t = DEFAULT_BLOCK_COUNT)]
    pub blocks: usize,

    /// Maximum bytes read from a response before each write
    #[arg(long = "buffer-size", default_value_t = DEFAULT_BUFFER_SIZE)]
    pub buffer_size: usize,

    /// Do not sync every write to disk
    #[arg(long = "no-sync")]
    pub no_sync: bool,

    /// Expected SHA-256 of the complete file (hex)
    #[arg(long = "sha256")]
    pub sha256: Option<String>,

    /// Connect timeout in seconds
    #[arg(long = "connect-timeout", default_value_t = 10)]
    pub connect_timeout: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(commands::run_download(args))
}
