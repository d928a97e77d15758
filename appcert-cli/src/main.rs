//! appcert -- appliance certification runner
//!
//! Entry point: parse arguments, initialize logging, dispatch to a command
//! handler and map its error to a process exit code.

mod cli;
mod commands;
mod error;
mod logging;
mod output;
mod target;

use clap::Parser;
use colored::Colorize;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logging must be up before commands load the config properly, so the
    // [general] section is read best-effort here.
    let general = commands::load_general(&cli.config).await;

    if let Err(e) = logging::init_tracing(&general, cli.log_level.as_deref()) {
        eprintln!("{} {e:#}", "warning:".yellow().bold());
    }
    appcert_core::metrics::describe_all();

    if let Err(e) = run(cli).await {
        eprintln!("{} {e}", "error:".red().bold());
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);
    let config_path = cli.config.as_path();

    match cli.command {
        Commands::Run(args) => commands::run::execute(args, config_path, &writer).await,
        Commands::Wait(args) => commands::wait::execute(args, config_path, &writer).await,
        Commands::Suites(args) => commands::suites::execute(args, config_path, &writer).await,
        Commands::Config(args) => commands::config::execute(args, config_path, &writer).await,
    }
}
