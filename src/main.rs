use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use calcprobe::{
    config::{self, DEFAULT_CONFIG_PATH},
    init_tracing,
    suite::Driver,
};
use tracing::info;

/// Command-line interface of the harness.
#[derive(Parser)]
#[command(
    name = "calcprobe",
    about = "End-to-end scenario driver for the calculations web service",
    disable_version_flag = true
)]
struct Cli {
    /// Override configuration path
    #[arg(long = "config", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run_suite(cli.config).await
}

async fn run_suite(config_path: PathBuf) -> Result<()> {
    info!(
        path = %config_path.display(),
        "Starting calcprobe with configuration path"
    );

    let config = config::initialize(Some(config_path)).await;
    info!(
        base_url = %config.target.base_url,
        "Running scenario suite"
    );

    let mut driver = Driver::new(config)?;
    let report = driver.run().await;

    print!("{report}");

    if !report.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
