//! `appcert run` command handler

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use appcert_poller::PollConfig;
use appcert_suite::{CheckStatus, Suite, SuiteLoader, SuiteReport, SuiteRunner, TestContext};

use crate::cli::RunArgs;
use crate::commands::{cancel_on_ctrl_c, load_config};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};
use crate::target::Target;

/// Execute the `run` command.
pub async fn execute(
    args: RunArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let mut config = load_config(config_path).await?;
    config.params.extend(args.params);

    let suites_dir = args
        .suites_dir
        .unwrap_or_else(|| PathBuf::from(&config.suites.dir));
    let suites = select_suites(&suites_dir, &args.suites).await?;
    if suites.is_empty() {
        return Err(CliError::Suite(format!(
            "no suites found in {}",
            suites_dir.display()
        )));
    }

    let target = Target::resolve(&config, &args.target)?;
    let defaults = PollConfig::from_core(&config.poll)?;
    let cancel = cancel_on_ctrl_c();
    let fail_fast = args.fail_fast || config.suites.fail_fast;

    let ctx = TestContext::new(target)
        .with_params(config.params.clone())
        .with_defaults(defaults)
        .with_cancellation(cancel.clone());
    let runner = SuiteRunner::new(ctx).fail_fast(fail_fast);

    info!(
        host = runner.context().target(),
        suites = suites.len(),
        fail_fast,
        "starting run"
    );

    let mut reports = Vec::with_capacity(suites.len());
    for suite in &suites {
        if cancel.is_cancelled() {
            break;
        }
        let report = runner.run(suite).await;
        let stop = fail_fast && !report.passed();
        reports.push(report);
        if stop {
            break;
        }
    }

    let summary = RunSummary::new(reports).interrupted(cancel.is_cancelled());
    writer.render(&summary)?;
    summary.into_result()
}

/// Resolve suite arguments: paths load a single file, anything else is a
/// suite name looked up in `dir`. No arguments selects every suite in `dir`.
async fn select_suites(dir: &Path, selectors: &[String]) -> Result<Vec<Suite>, CliError> {
    if selectors.is_empty() {
        return Ok(SuiteLoader::load_directory(dir).await?);
    }

    let mut available: Option<Vec<Suite>> = None;
    let mut selected = Vec::with_capacity(selectors.len());
    for selector in selectors {
        if looks_like_path(selector) {
            selected.push(SuiteLoader::load_file(selector).await?);
            continue;
        }
        if available.is_none() {
            available = Some(SuiteLoader::load_directory(dir).await?);
        }
        let suite = available
            .iter()
            .flatten()
            .find(|s| s.name == *selector)
            .cloned()
            .ok_or_else(|| {
                CliError::Suite(format!(
                    "no suite named '{selector}' in {}",
                    dir.display()
                ))
            })?;
        selected.push(suite);
    }
    Ok(selected)
}

fn looks_like_path(selector: &str) -> bool {
    let path = Path::new(selector);
    selector.contains('/')
        || path
            .extension()
            .is_some_and(|ext| ext == "yml" || ext == "yaml")
}

/// Result of an `appcert run`.
#[derive(Serialize)]
pub struct RunSummary {
    pub passed: bool,
    pub cancelled: bool,
    pub reports: Vec<SuiteReport>,
}

impl RunSummary {
    pub fn new(reports: Vec<SuiteReport>) -> Self {
        let passed = !reports.is_empty() && reports.iter().all(SuiteReport::passed);
        let cancelled = reports.iter().any(|r| r.cancelled);
        Self {
            passed,
            cancelled,
            reports,
        }
    }

    /// Mark the run cancelled even if no suite observed the interrupt,
    /// e.g. Ctrl-C before the first suite started.
    pub fn interrupted(mut self, cancelled: bool) -> Self {
        self.cancelled |= cancelled;
        self
    }

    /// Map the run outcome to a CLI result (and thus an exit code).
    pub fn into_result(self) -> Result<(), CliError> {
        if self.cancelled {
            return Err(CliError::Cancelled("run interrupted".to_owned()));
        }
        if self.passed {
            return Ok(());
        }

        let failed: Vec<&str> = self
            .reports
            .iter()
            .filter(|r| !r.passed())
            .map(|r| r.suite.as_str())
            .collect();
        let detail = format!("suites failed: {}", failed.join(", "));
        if self.reports.iter().any(|r| r.target_unreachable) {
            Err(CliError::TargetUnreachable(detail))
        } else {
            Err(CliError::ChecksFailed(detail))
        }
    }
}

impl Render for RunSummary {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        for report in &self.reports {
            render_report(report, w)?;
            writeln!(w)?;
        }
        Ok(())
    }
}

fn render_report(report: &SuiteReport, w: &mut dyn Write) -> std::io::Result<()> {
    use colored::Colorize;

    writeln!(
        w,
        "Suite {} (target: {}, run: {})",
        report.suite.bold(),
        report.target,
        report.run_id
    )?;

    for check in &report.checks {
        let label = match check.status {
            CheckStatus::Passed => "PASS".green(),
            CheckStatus::Failed => "FAIL".red().bold(),
            CheckStatus::Warned => "WARN".yellow(),
            CheckStatus::Skipped => "SKIP".dimmed(),
        };
        writeln!(
            w,
            "  {label}  {:<45} {} attempt(s), {:.1}s",
            check.name,
            check.attempts,
            check.elapsed_ms as f64 / 1000.0
        )?;
        if check.status != CheckStatus::Passed {
            if let Some(message) = &check.message {
                writeln!(w, "        {message}")?;
            }
            if let Some(last) = &check.last_output {
                writeln!(w, "        last: {}", last.dimmed())?;
            }
        }
    }

    for warning in &report.cleanup_warnings {
        writeln!(w, "  {}  {warning}", "CLEANUP".yellow())?;
    }

    let result = if report.cancelled {
        "CANCELLED".yellow().bold()
    } else if report.passed() {
        "PASSED".green().bold()
    } else {
        "FAILED".red().bold()
    };
    writeln!(
        w,
        "  Result: {result}  {} passed, {} failed, {} warned, {} skipped ({:.1}s)",
        report.count(CheckStatus::Passed),
        report.count(CheckStatus::Failed),
        report.count(CheckStatus::Warned),
        report.count(CheckStatus::Skipped),
        report.elapsed_ms as f64 / 1000.0
    )
}
