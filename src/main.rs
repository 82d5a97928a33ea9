mod app;
mod config;

use anyhow::{Context, Result};
use clap::Parser;

use app::{App, Cli};
use config::CodecConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = CodecConfig::load(cli.config.as_deref())
        .context("Config: Failed to load codec configuration")?;
    if let Some(mode) = cli.nested_ids {
        config.nested_ids = mode;
    }

    tracing::info!(
        "Config: default revision {}, nested identifiers: {}, {} extra CRS definition(s)",
        config.default_version,
        config.nested_ids.label(),
        config.crs.len()
    );

    let app = App::new(&config)?;
    app.run(&cli.command)
}
