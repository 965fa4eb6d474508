//! Off-street parking service.
//!
//! Counts vehicles entering and leaving an off-street parking from the
//! observations of its parking spots.

use std::path::PathBuf;

use clap::Parser;
use ktwin::prelude::*;

mod model;
mod service;

#[derive(Debug, Parser)]
#[command(name = "parking-service", version, about)]
struct Cli {
    /// Configuration file, in addition to the default search paths.
    #[arg(short, long, env = "KTWIN_CONFIG")]
    config: Option<PathBuf>,

    /// Configuration profile, e.g. `production`.
    #[arg(short, long)]
    profile: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new()
        .merge(service::defaults())
        .maybe_file(cli.config);
    if let Some(profile) = cli.profile {
        loader = loader.profile(profile);
    }
    let config = loader.load()?;

    let runtime = TwinRuntime::from_config(config, service::routes)?;
    info!(
        service = %runtime.config().service.name,
        mode = %runtime.config().service.mode,
        "Starting up server..."
    );
    runtime.run().await?;

    info!("Parking service stopped");
    Ok(())
}
