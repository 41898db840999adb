mod cli;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("loanex=info,loanex_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            file,
            tuning,
            table,
        } => {
            let succeeded = cli::process::run(&file, &tuning, table.as_deref()).await?;
            Ok(if succeeded {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Inspect { file, tuning, json } => {
            cli::inspect::run(&file, &tuning, json).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
