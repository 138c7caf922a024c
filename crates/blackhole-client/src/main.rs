use anyhow::Result;
use blackhole_client::cli::{env_filter, Cli};
use blackhole_client::FileProcessor;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(env_filter())
        .init();

    let cli = Cli::parse();
    let config = cli.load_config()?;
    let directory = cli.directory(&config).to_path_buf();

    tracing::info!(
        directory = %directory.display(),
        base_url = %config.base_url,
        workers = config.workers,
        "Blackhole client starting"
    );

    let processor = FileProcessor::from_config(config)?;
    let report = processor.process_directory(&directory).await?;

    tracing::info!(
        "Done: {} processed, {} failed in {}",
        report.processed(),
        report.failed(),
        report.directory.display()
    );
    Ok(())
}
