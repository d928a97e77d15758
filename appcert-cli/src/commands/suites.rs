//! `appcert suites` command handler

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use appcert_suite::SuiteLoader;

use crate::cli::{SuitesAction, SuitesArgs};
use crate::commands::load_config;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `suites` command.
pub async fn execute(
    args: SuitesArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = load_config(config_path).await?;
    let default_dir = PathBuf::from(&config.suites.dir);

    match args.action {
        SuitesAction::List { dir } => execute_list(dir.unwrap_or(default_dir), writer).await,
        SuitesAction::Validate { path } => {
            execute_validate(path.unwrap_or(default_dir), writer).await
        }
    }
}

async fn execute_list(dir: PathBuf, writer: &OutputWriter) -> Result<(), CliError> {
    info!(dir = %dir.display(), "listing suites");

    let suites = SuiteLoader::load_directory(&dir).await?;
    let list = SuiteListReport {
        dir: dir.display().to_string(),
        suites: suites
            .iter()
            .map(|suite| SuiteSummary {
                name: suite.name.clone(),
                description: suite.description.clone(),
                checks: suite.checks.len(),
            })
            .collect(),
    };

    writer.render(&list)
}

/// Validate every suite file and report per-file errors.
///
/// # Errors
///
/// Returns `CliError::Suite` if at least one file is invalid.
async fn execute_validate(dir: PathBuf, writer: &OutputWriter) -> Result<(), CliError> {
    info!(dir = %dir.display(), "validating suites");

    let results = SuiteLoader::check_directory(&dir).await?;
    let files: Vec<SuiteFileStatus> = results
        .into_iter()
        .map(|(path, result)| match result {
            Ok(suite) => SuiteFileStatus {
                path: path.display().to_string(),
                suite: Some(suite.name),
                error: None,
            },
            Err(e) => SuiteFileStatus {
                path: path.display().to_string(),
                suite: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    let report = SuiteValidationReport {
        dir: dir.display().to_string(),
        files,
    };
    writer.render(&report)?;

    let invalid = report.invalid_count();
    if invalid > 0 {
        return Err(CliError::Suite(format!(
            "{invalid} of {} suite file(s) invalid",
            report.files.len()
        )));
    }
    Ok(())
}

#[derive(Serialize)]
pub struct SuiteSummary {
    pub name: String,
    pub description: String,
    pub checks: usize,
}

#[derive(Serialize)]
pub struct SuiteListReport {
    pub dir: String,
    pub suites: Vec<SuiteSummary>,
}

impl Render for SuiteListReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Suites in {}", self.dir.bold())?;
        if self.suites.is_empty() {
            writeln!(w, "  (none)")?;
            return Ok(());
        }
        for suite in &self.suites {
            writeln!(
                w,
                "  {:<20} {:>3} check(s)  {}",
                suite.name,
                suite.checks,
                suite.description.dimmed()
            )?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
pub struct SuiteFileStatus {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suite: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct SuiteValidationReport {
    pub dir: String,
    pub files: Vec<SuiteFileStatus>,
}

impl SuiteValidationReport {
    fn invalid_count(&self) -> usize {
        self.files.iter().filter(|f| f.error.is_some()).count()
    }
}

impl Render for SuiteValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Suite Validation: {}", self.dir.bold())?;
        for file in &self.files {
            match (&file.suite, &file.error) {
                (_, Some(err)) => {
                    writeln!(w, "  {}  {}", "INVALID".red().bold(), file.path)?;
                    writeln!(w, "    Error: {}", err.red())?;
                }
                (Some(name), None) => {
                    writeln!(w, "  {}    {} ({name})", "VALID".green().bold(), file.path)?;
                }
                (None, None) => writeln!(w, "  {}", file.path)?,
            }
        }

        let invalid = self.invalid_count();
        let summary = format!("{} file(s), {invalid} invalid", self.files.len());
        if invalid == 0 {
            writeln!(w, "  Result: {}", summary.green())?;
        } else {
            writeln!(w, "  Result: {}", summary.red())?;
        }
        Ok(())
    }
}
