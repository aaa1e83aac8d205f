use anyhow::Result;
use clap::Parser;

use shoplytics_cli::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so the JSON report on stdout stays clean. Level via RUST_LOG.
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("shoplytics=info".parse()?);
    if cli.log_json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    shoplytics_cli::commands::run(cli.command)
}
