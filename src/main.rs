//! Main entry point for the zipgrab CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use zipgrab::app::failure_context;
use zipgrab::{Cli, Config, HttpRangeTransport, Mode, ReadAt, RemoteArchive, RemoteReader};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config: Config = cli.into_config()?;

    let transport = HttpRangeTransport::new(&config.url, config.timeout)
        .with_context(|| format!("Unable to create reader for url: {}", config.url))?;
    let reader = RemoteReader::new(transport);

    reader
        .length()
        .await
        .context("Unable to get reader length")?;

    let archive = RemoteArchive::from_reader(reader)
        .await
        .with_context(|| format!("Unable to create zip reader for url: {}", config.url))?;

    match &config.mode {
        Mode::List => print!("{}", archive.catalog().listing()),
        Mode::Extract(request) => {
            archive.extract(request).await.map_err(|e| {
                let context = failure_context(request, &e);
                anyhow::Error::new(e).context(context)
            })?;
        }
    }

    info!(
        transferred = archive.transferred_bytes(),
        "total bytes transferred"
    );

    Ok(())
}
