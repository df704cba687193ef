//! SparkNet CLI binary entrypoint.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sparknet_cli::cli::{Cli, Commands};
use sparknet_cli::commands::{InitCommand, KeygenCommand, MarketCommand, load_config};
use sparknet_cli::output::OutputFormat;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), sparknet_cli::CliError> {
    let format = OutputFormat::new(cli.format);
    let mut stdout = io::stdout().lock();

    match &cli.command {
        Commands::Keygen => KeygenCommand.execute(&mut stdout, &format)?,
        Commands::Init { admin_secret } => {
            let config = load_config(&cli)?;
            InitCommand::new(config)
                .execute(&mut stdout, &format, admin_secret)
                .await?;
        }
        command => {
            let config = load_config(&cli)?;
            MarketCommand::new(&config, cli.secret.clone())?
                .execute(&mut stdout, &format, command)
                .await?;
        }
    }

    Ok(())
}
