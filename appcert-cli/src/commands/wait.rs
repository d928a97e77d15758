//! `appcert wait` command handler
//!
//! Thin wrapper over [`ConditionPoller`]: one command, one condition.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use appcert_core::executor::CommandExecutor;
use appcert_core::types::CommandOutput;
use appcert_poller::{
    CommandProbe, ConditionPoller, FaultPolicy, PollConfig, PollConfigBuilder, PollOutcome,
};

use crate::cli::WaitArgs;
use crate::commands::{cancel_on_ctrl_c, load_config};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};
use crate::target::Target;

/// Execute the `wait` command.
pub async fn execute(
    args: WaitArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = load_config(config_path).await?;
    let target = Target::resolve(&config, &args.target)?;
    let poll = build_poll_config(PollConfig::from_core(&config.poll)?, &args)?;
    let condition = Condition::from_args(&args);

    info!(
        host = target.target(),
        command = %args.command,
        timeout_secs = poll.timeout.as_secs(),
        interval_secs = poll.interval.as_secs(),
        "waiting for condition"
    );

    let poller = ConditionPoller::with_cancellation(poll, cancel_on_ctrl_c())?;
    let timeout_secs = poller.config().timeout.as_secs();
    let mut probe = CommandProbe::new(target, args.command.clone(), {
        let condition = condition.clone();
        move |out: &CommandOutput| condition.is_met(out)
    });
    let outcome = poller.poll(&mut probe).await?;

    let report = WaitReport::new(&args.command, timeout_secs, &condition, &outcome);
    writer.render(&report)?;

    match outcome {
        PollOutcome::Succeeded { .. } => Ok(()),
        PollOutcome::Cancelled { .. } => Err(CliError::Cancelled("wait interrupted".to_owned())),
        PollOutcome::TimedOut { last_fault, last, .. } => {
            let fault_only = last.is_none() && last_fault.as_ref().is_some_and(|f| f.is_transport());
            if fault_only {
                Err(CliError::TargetUnreachable(report.message))
            } else {
                Err(CliError::ChecksFailed(report.message))
            }
        }
    }
}

/// Apply command-line overrides on top of the `[poll]` defaults.
fn build_poll_config(defaults: PollConfig, args: &WaitArgs) -> Result<PollConfig, CliError> {
    let mut builder = PollConfigBuilder::from_config(defaults);
    if let Some(secs) = args.timeout {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = args.interval {
        builder = builder.interval(Duration::from_secs(secs));
    }
    if args.retry_faults {
        builder = builder.fault_policy(FaultPolicy::Retry);
    }
    if let Some(max) = args.max_attempts {
        builder = builder.max_attempts(max);
    }
    Ok(builder.build()?)
}

#[derive(Debug, Clone)]
struct Condition {
    exit_code: i32,
    contains: Option<String>,
    equals: Option<String>,
}

impl Condition {
    fn from_args(args: &WaitArgs) -> Self {
        Self {
            exit_code: args.exit_code,
            contains: args.contains.clone(),
            equals: args.equals.clone(),
        }
    }

    fn is_met(&self, out: &CommandOutput) -> bool {
        out.exit_code == self.exit_code
            && self
                .contains
                .as_deref()
                .is_none_or(|needle| out.stdout.contains(needle))
            && self
                .equals
                .as_deref()
                .is_none_or(|expected| out.stdout_trimmed() == expected)
    }

    fn describe(&self) -> String {
        let mut parts = vec![format!("exit code {}", self.exit_code)];
        if let Some(needle) = &self.contains {
            parts.push(format!("stdout containing '{needle}'"));
        }
        if let Some(expected) = &self.equals {
            parts.push(format!("stdout equal to '{expected}'"));
        }
        parts.join(" and ")
    }
}

/// Result of an `appcert wait`.
#[derive(Serialize)]
pub struct WaitReport {
    pub command: String,
    pub outcome: &'static str,
    pub attempts: u32,
    pub elapsed_ms: u64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_output: Option<String>,
}

impl WaitReport {
    fn new(
        command: &str,
        timeout_secs: u64,
        condition: &Condition,
        outcome: &PollOutcome<CommandOutput>,
    ) -> Self {
        let stats = outcome.stats();
        let message = match outcome {
            PollOutcome::Succeeded { .. } => format!("condition met: {}", condition.describe()),
            PollOutcome::Cancelled { .. } => "cancelled".to_owned(),
            PollOutcome::TimedOut {
                last_fault: Some(fault),
                ..
            } => format!("Timeout after {timeout_secs}s ({} attempts): {fault}", stats.attempts),
            PollOutcome::TimedOut { .. } => format!(
                "Timeout after {timeout_secs}s ({} attempts): expected {}",
                stats.attempts,
                condition.describe()
            ),
        };

        Self {
            command: command.to_owned(),
            outcome: outcome.kind(),
            attempts: stats.attempts,
            elapsed_ms: u64::try_from(stats.elapsed.as_millis()).unwrap_or(u64::MAX),
            message,
            last_output: outcome.last_output().map(CommandOutput::summary),
        }
    }
}

impl Render for WaitReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let label = match self.outcome {
            "succeeded" => "READY".green().bold(),
            "cancelled" => "CANCELLED".yellow().bold(),
            _ => "TIMEOUT".red().bold(),
        };
        writeln!(w, "{label}  `{}`", self.command)?;
        writeln!(
            w,
            "  {} ({} attempt(s), {:.1}s)",
            self.message,
            self.attempts,
            self.elapsed_ms as f64 / 1000.0
        )?;
        if let Some(last) = &self.last_output {
            writeln!(w, "  last: {last}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appcert_poller::{PollStats, ProbeResult};
    use clap::Parser;

    use crate::cli::{Cli, Commands};

    fn wait_args(extra: &[&str]) -> WaitArgs {
        let mut argv = vec!["appcert", "wait", "--command", "cat /etc/motd"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).expect("parse").command {
            Commands::Wait(args) => args,
            _ => panic!("expected Wait"),
        }
    }

    #[test]
    fn test_poll_overrides() {
        let args = wait_args(&["--timeout", "300", "--interval", "10", "--retry-faults"]);
        let config = build_poll_config(PollConfig::default(), &args).expect("valid");
        assert_eq!(config.timeout, Duration::from_secs(300));
        assert_eq!(config.interval, Duration::from_secs(10));
        assert_eq!(config.fault_policy, FaultPolicy::Retry);
    }

    #[test]
    fn test_zero_interval_is_config_error() {
        let args = wait_args(&["--interval", "0"]);
        let err = build_poll_config(PollConfig::default(), &args).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_condition_matching() {
        let args = wait_args(&["--contains", "All set and ready to serve"]);
        let condition = Condition::from_args(&args);
        assert!(condition.is_met(&CommandOutput::new(0, " All set and ready to serve\n", "")));
        assert!(!condition.is_met(&CommandOutput::new(0, "booting", "")));
        assert!(!condition.is_met(&CommandOutput::new(1, "All set and ready to serve", "")));

        let equals = Condition::from_args(&wait_args(&["--equals", "active", "--exit-code", "0"]));
        assert!(equals.is_met(&CommandOutput::new(0, "active\n", "")));
        assert!(!equals.is_met(&CommandOutput::new(0, "inactive\n", "")));
    }

    #[test]
    fn test_timeout_report_message() {
        let condition = Condition::from_args(&wait_args(&["--contains", "ready"]));
        let outcome: PollOutcome<CommandOutput> = PollOutcome::TimedOut {
            last: Some(ProbeResult::not_ready(CommandOutput::new(0, "booting", ""))),
            last_fault: None,
            stats: PollStats {
                attempts: 13,
                elapsed: Duration::from_secs(60),
            },
        };
        let report = WaitReport::new("cat /etc/motd", 60, &condition, &outcome);
        assert_eq!(report.outcome, "timed_out");
        assert_eq!(
            report.message,
            "Timeout after 60s (13 attempts): expected exit code 0 and stdout containing 'ready'"
        );
        assert!(report.last_output.as_deref().unwrap_or_default().contains("booting"));
        assert_eq!(report.elapsed_ms, 60_000);
    }
}
