//! `appcert config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use appcert_core::config::AppcertConfig;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::commands::load_config;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

const SECTIONS: &str = "general, target, poll, suites, params";
const REDACTED: &str = "***REDACTED***";

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, writer).await,
        ConfigAction::Show { section } => execute_show(config_path, section, writer).await,
    }
}

/// Load and validate the configuration file, reporting any errors.
///
/// Unlike every other command a missing file is an error here.
///
/// # Errors
///
/// Returns `CliError::Config` if the file is missing, unparsable or invalid.
async fn execute_validate(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %config_path.display(), "validating configuration");

    let source = config_path.display().to_string();
    let report = match AppcertConfig::load(config_path).await {
        Ok(_) => ConfigValidationReport {
            source,
            valid: true,
            errors: Vec::new(),
        },
        Err(e) => ConfigValidationReport {
            source,
            valid: false,
            errors: vec![e.to_string()],
        },
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }

    Ok(())
}

/// Display the effective configuration (file + env overrides + defaults).
///
/// Secret-looking parameters are redacted.
async fn execute_show(
    config_path: &Path,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(path = %config_path.display(), "loading configuration");

    let mut config = load_config(config_path).await?;
    redact_params(&mut config);

    let (config_toml, config_json) = match section.as_deref() {
        None => section_view(&config),
        Some("general") => section_view(&config.general),
        Some("target") => section_view(&config.target),
        Some("poll") => section_view(&config.poll),
        Some("suites") => section_view(&config.suites),
        Some("params") => section_view(&config.params),
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {other} (expected: {SECTIONS})"
            )));
        }
    };

    let report = ConfigReport {
        source: config_path.display().to_string(),
        section,
        config: config_json,
        config_toml,
    };
    writer.render(&report)?;

    Ok(())
}

fn to_toml<T: Serialize>(value: &T) -> String {
    toml::to_string_pretty(value).unwrap_or_else(|e| format!("(serialization error: {e})"))
}

/// TOML text for the terminal and a JSON value for `--output json`.
fn section_view<T: Serialize>(value: &T) -> (String, serde_json::Value) {
    let json = serde_json::to_value(value)
        .unwrap_or_else(|e| serde_json::Value::String(format!("(serialization error: {e})")));
    (to_toml(value), json)
}

/// Replace values of parameters whose names look like credentials.
fn redact_params(config: &mut AppcertConfig) {
    for (key, value) in config.params.iter_mut() {
        if is_secret_name(key) && !value.is_empty() {
            *value = REDACTED.to_owned();
        }
    }
}

fn is_secret_name(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    ["PASS", "SECRET", "TOKEN", "KEY"]
        .iter()
        .any(|marker| upper.contains(marker))
}

/// Configuration display report.
///
/// `config_toml` is only used for text rendering; JSON output carries
/// `config` instead.
#[derive(Serialize)]
pub struct ConfigReport {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub config: serde_json::Value,
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(ref section) = self.section {
            let section_label = format!("[{section}]");
            writeln!(
                w,
                "Configuration {} (source: {})",
                section_label.bold(),
                self.source
            )?;
        } else {
            writeln!(w, "Configuration (source: {})", self.source.bold())?;
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)?;

        Ok(())
    }
}

/// Configuration validation report.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    pub source: String,
    pub valid: bool,
    /// Empty if valid
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Config Validation: {}", self.source.bold())?;

        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(payload: &impl Render) -> String {
        let mut buffer = Vec::new();
        payload
            .render_text(&mut buffer)
            .expect("text rendering should succeed");
        String::from_utf8(buffer).expect("valid UTF-8")
    }

    #[test]
    fn test_secret_names() {
        assert!(is_secret_name("ONEAPP_N8N_ADMIN_PASSWORD"));
        assert!(is_secret_name("ONEAPP_RABBITMQ_API_TOKEN"));
        assert!(is_secret_name("oneapp_ssh_key"));
        assert!(!is_secret_name("ONEAPP_REDIS_PORT"));
    }

    #[test]
    fn test_redact_params_keeps_plain_values() {
        let mut config = AppcertConfig::default();
        config
            .params
            .insert("ONEAPP_N8N_PASSWORD".to_owned(), "hunter2".to_owned());
        config
            .params
            .insert("ONEAPP_N8N_PORT".to_owned(), "5678".to_owned());
        config
            .params
            .insert("ONEAPP_EMPTY_SECRET".to_owned(), String::new());

        redact_params(&mut config);

        assert_eq!(config.params["ONEAPP_N8N_PASSWORD"], REDACTED);
        assert_eq!(config.params["ONEAPP_N8N_PORT"], "5678");
        assert_eq!(config.params["ONEAPP_EMPTY_SECRET"], "");
    }

    #[test]
    fn test_config_report_render_text_section() {
        let report = ConfigReport {
            source: "/etc/appcert.toml".to_owned(),
            section: Some("poll".to_owned()),
            config: serde_json::json!({ "timeout_secs": 60 }),
            config_toml: "timeout_secs = 60\n".to_owned(),
        };

        let output = render(&report);
        assert!(output.contains("[poll]"), "should show section name");
        assert!(output.contains("timeout_secs = 60"));
    }

    #[test]
    fn test_config_report_json_carries_config() {
        let mut config = AppcertConfig::default();
        config
            .params
            .insert("ONEAPP_N8N_PORT".to_owned(), "5678".to_owned());
        let (config_toml, config_json) = section_view(&config);
        let report = ConfigReport {
            source: "appcert.toml".to_owned(),
            section: None,
            config: config_json,
            config_toml,
        };

        let parsed = serde_json::to_value(&report).expect("JSON serialization should succeed");
        assert_eq!(parsed["source"].as_str(), Some("appcert.toml"));
        assert!(parsed.get("section").is_none());
        assert!(parsed.get("config_toml").is_none());
        assert_eq!(parsed["config"]["poll"]["interval_secs"].as_u64(), Some(5));
        assert_eq!(parsed["config"]["general"]["log_level"].as_str(), Some("info"));
        assert_eq!(
            parsed["config"]["params"]["ONEAPP_N8N_PORT"].as_str(),
            Some("5678")
        );
    }

    #[test]
    fn test_section_view_json_matches_section() {
        let config = AppcertConfig::default();
        let (toml, json) = section_view(&config.poll);
        assert!(toml.contains("interval_secs = 5"));
        assert_eq!(json["interval_secs"].as_u64(), Some(5));
        assert!(json.get("general").is_none());
    }

    #[test]
    fn test_config_validation_report_invalid() {
        let report = ConfigValidationReport {
            source: "bad.toml".to_owned(),
            valid: false,
            errors: vec!["invalid poll.interval_secs: must be 1-3600".to_owned()],
        };

        let output = render(&report);
        assert!(output.contains("INVALID"));
        assert!(output.contains("poll.interval_secs"));
    }

    #[test]
    fn test_config_validation_report_valid() {
        let report = ConfigValidationReport {
            source: "appcert.toml".to_owned(),
            valid: true,
            errors: Vec::new(),
        };

        let output = render(&report);
        assert!(output.contains("VALID"));
        assert!(!output.contains("Error:"));
    }

    #[test]
    fn test_full_config_serializes_to_toml() {
        let toml = to_toml(&AppcertConfig::default());
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[poll]"));
        assert!(toml.contains("interval_secs = 5"));
    }
}
