//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// appcert -- appliance certification runner.
///
/// Use `appcert <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "appcert", version, about, long_about = None)]
pub struct Cli {
    /// Path to the appcert.toml configuration file.
    #[arg(short, long, default_value = "appcert.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run appliance suites against a target.
    Run(RunArgs),

    /// Poll a single command until its output satisfies a condition.
    Wait(WaitArgs),

    /// Inspect suite definitions.
    Suites(SuitesArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

/// Where commands are executed. Flags override `[target]`.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Target host (overrides `[target].host`).
    #[arg(long, conflicts_with = "local")]
    pub host: Option<String>,

    /// Run commands on this machine instead of over ssh.
    #[arg(long)]
    pub local: bool,
}

// ---- run ----

/// Run suites and report per-check results.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Suite files or suite names (default: every suite in `[suites].dir`).
    pub suites: Vec<String>,

    #[command(flatten)]
    pub target: TargetArgs,

    /// App parameter for `${NAME}` placeholders, repeatable (KEY=VALUE).
    #[arg(short, long = "param", value_parser = parse_param)]
    pub params: Vec<(String, String)>,

    /// Skip remaining checks after the first hard failure.
    #[arg(long)]
    pub fail_fast: bool,

    /// Suite directory (overrides `[suites].dir`).
    #[arg(long)]
    pub suites_dir: Option<PathBuf>,
}

// ---- wait ----

/// Poll one command with the ConditionPoller.
#[derive(Args, Debug)]
pub struct WaitArgs {
    /// Shell command to run on each attempt.
    #[arg(long)]
    pub command: String,

    /// Required substring of stdout.
    #[arg(long)]
    pub contains: Option<String>,

    /// Required trimmed stdout.
    #[arg(long)]
    pub equals: Option<String>,

    /// Required exit code.
    #[arg(long, default_value_t = 0)]
    pub exit_code: i32,

    /// Total time budget in seconds (overrides `[poll].timeout_secs`).
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Pause between attempts in seconds (overrides `[poll].interval_secs`).
    #[arg(long)]
    pub interval: Option<u64>,

    /// Treat transport and execution failures as "not ready yet".
    #[arg(long)]
    pub retry_faults: bool,

    /// Maximum number of attempts.
    #[arg(long)]
    pub max_attempts: Option<u32>,

    #[command(flatten)]
    pub target: TargetArgs,
}

// ---- suites ----

/// Inspect suite definitions.
#[derive(Args, Debug)]
pub struct SuitesArgs {
    #[command(subcommand)]
    pub action: SuitesAction,
}

#[derive(Subcommand, Debug)]
pub enum SuitesAction {
    /// List suites found in the suite directory.
    List {
        /// Suite directory (default: `[suites].dir`).
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Validate suite files and report per-file errors.
    Validate {
        /// Directory containing YAML suite files (default: `[suites].dir`).
        path: Option<PathBuf>,
    },
}

// ---- config ----

/// Manage appcert configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, target, poll, suites, params).
        #[arg(long)]
        section: Option<String>,
    },
}

/// Parse a `KEY=VALUE` pair.
fn parse_param(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    if !appcert_core::config::is_valid_param_name(key) {
        return Err(format!(
            "'{key}' is not a valid parameter name (expected [A-Za-z_][A-Za-z0-9_]*)"
        ));
    }
    Ok((key.to_owned(), value.to_owned()))
}
