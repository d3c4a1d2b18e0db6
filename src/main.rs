mod cli;
mod dispatcher;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    // Logs go to stderr so --json output stays parseable; RUST_LOG overrides
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(!cli.no_color)
        .init();

    let config = tesouro::config::load_config(cli.config.as_deref())
        .context("Failed to load configuration")?;

    dispatcher::dispatch_command(&cli, &config)
}
