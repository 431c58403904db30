use anyhow::Result;
use clap::Parser;
use tokio::runtime::Builder;

use tailnet_admin::cli::Cli;
use tailnet_admin::commands;

fn main() -> Result<()> {
    // Variables from .env feed clap's env fallbacks, so load it before parsing
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Devices are processed one at a time; a single-threaded runtime is enough
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(commands::run(cli))
}
