//! sdcheck -- service-discovery and network-policy acceptance check.
//!
//! ```text
//! sdcheck run                      # push apps, check policy gating, clean up
//! sdcheck config validate          # check sdcheck.toml
//! sdcheck config show --section apps
//! ```

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use std::process::ExitCode;

use clap::Parser;

use sdcheck_core::config::GeneralConfig;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);

    match cli.command {
        // `run` initializes logging itself once the config's [general] section is known
        Commands::Run(args) => {
            commands::run::execute(args, &cli.config, cli.log_level.as_deref(), &writer).await
        }
        Commands::Config(args) => {
            logging::init_tracing(&GeneralConfig::default(), cli.log_level.as_deref())
                .map_err(|e| CliError::Config(e.to_string()))?;
            commands::config::execute(args, &cli.config, &writer).await
        }
    }
}
