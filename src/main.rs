//! spendlog - CLI entry point.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use std::process::ExitCode;

use clap::Parser;

use spendlog::cli::output::render_error;
use spendlog::cli::{Cli, Commands, OutputFormat};
use spendlog::core::logging::{self, LogFormat, LogLevel, LogSettings};
use spendlog::core::services::Services;
use spendlog::storage::{Config, Secrets};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let cli_level = cli.log_level.as_deref().and_then(LogLevel::from_arg);
    let cli_format = cli.json_output.then_some(LogFormat::Json);
    logging::init(&LogSettings::resolve(cli_level, cli_format, cli.verbose));

    let format = cli.effective_format();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(code = e.error_code(), error = %e, "command failed");
            eprintln!("{}", render_error(&e, format == OutputFormat::Json));
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

async fn run(cli: Cli) -> spendlog::Result<()> {
    let format = cli.effective_format();
    let pretty = cli.pretty;

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let services = Services::build(config, Secrets::from_env())?;

    match cli.command {
        Commands::Estimate(args) => {
            spendlog::cli::estimate::execute(services.pricing(), &args, format, pretty)
        }
        Commands::Rates(args) => {
            spendlog::cli::rates::execute(services.pricing(), &args, format, pretty)
        }
        Commands::Notify(args) => {
            spendlog::cli::notify::execute(&services, &args, format, pretty).await
        }
        Commands::Auth => spendlog::cli::auth::execute(&services, format, pretty).await,
    }
}
