//! Binary entry point.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use borealis::error::EtlError;
use borealis::pipeline;

#[derive(Parser, Debug)]
#[command(name = "borealis", about = "Star-schema ETL for NDJSON event sources")]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Log level when RUST_LOG is not set (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[snafu::report]
#[tokio::main]
async fn main() -> Result<(), EtlError> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    pipeline::run_from_config_file(&args.config).await?;
    Ok(())
}
