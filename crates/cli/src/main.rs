//! mys3 - S3 browser for the terminal
//!
//! Browse, upload, download and delete objects in S3-compatible storage
//! using locally stored credential profiles.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use mys3_cli::commands::{self, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over --debug when both are given
    let default_level = if cli.debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let exit_code = commands::execute(cli).await;

    std::process::exit(exit_code.as_i32());
}
