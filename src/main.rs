//! regsearch - Main Entry Point

use clap::Parser;
use regsearch::cli::{cmd_config, cmd_demo, cmd_run, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "regsearch=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { data, target, config, output, seed, test_size } => {
            cmd_run(&data, &target, config.as_deref(), output.as_deref(), seed, test_size)?;
        }
        Commands::Demo { rows, seed, output } => {
            cmd_demo(rows, seed, output.as_deref())?;
        }
        Commands::Config => {
            cmd_config()?;
        }
    }

    Ok(())
}
