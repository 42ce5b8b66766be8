use anyhow::Context;
use clap::Parser;
use replik::config::Cli;
use replik::Config;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Convert CLI args to Config - this validates immediately
    let config = Config::try_from(cli).context("invalid configuration")?;

    if let Err(e) = replik::logging::init_subscriber(config.verbose) {
        eprintln!("Warning: failed to initialize logging: {}", e);
    }

    tracing::debug!(
        version = replik::VERSION,
        source = %config.source.display(),
        destination = %config.destination.display(),
        dry_run = config.dry_run,
        checksum = config.checksum_mode,
        "starting sync"
    );

    replik::commands::run(&config).with_context(|| {
        format!(
            "sync from {} to {} failed",
            config.source.display(),
            config.destination.display()
        )
    })?;

    Ok(())
}
