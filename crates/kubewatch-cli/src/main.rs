//! kubewatch binary entrypoint.

use std::io;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use kubewatch_cli::cli::{Cli, Commands, LogFormat};
use kubewatch_cli::commands::{ConfigCommand, RunCommand};

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.log_format) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

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
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("kubewatch=info".parse()?);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => {
            let cmd = RunCommand::new(cli.config, args);
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());

            tokio::select! {
                summary = cmd.execute(stdin) => {
                    summary.context("kubewatch run failed")?;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupted, shutting down");
                }
            }
        }
        Commands::Config { command } => {
            let cmd = ConfigCommand::new(cli.config);
            let mut stdout = io::stdout().lock();
            cmd.execute(&mut stdout, command)
                .context("kubewatch config failed")?;
        }
    }

    Ok(())
}
