//! Command execution against the appliance under test.
//!
//! The [`CommandExecutor`] trait abstracts "run this shell command on the
//! target and give me its exit code and output". Production code uses
//! [`SshExecutor`] (system `ssh` client, one process per command) or
//! [`LocalExecutor`] (`sh -c` on this host); tests plug in scripted mocks.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐
//! │ CommandProbe │    │ SuiteRunner  │
//! └──────┬───────┘    └──────┬───────┘
//!        └────────┬──────────┘
//!                 ▼
//!        ┌─────────────────┐
//!        │ CommandExecutor │ (trait)
//!        └─────────────────┘
//!            │         │
//!            ▼         ▼
//!      ┌──────────┐ ┌──────────┐
//!      │   Ssh    │ │  Local   │
//!      └────┬─────┘ └──────────┘
//!           ▼
//!      appliance VM
//! ```
//!
//! # Failure model
//!
//! A command that runs and exits non-zero is a normal [`CommandOutput`].
//! Only failures to run the command at all are errors:
//! - spawn failure → [`ExecutorError::Spawn`]
//! - ssh exit status 255 → [`ExecutorError::Transport`]
//! - per-command timeout → [`ExecutorError::Timeout`]

use std::future::Future;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::Instant;
use tracing::debug;

use crate::config::TargetConfig;
use crate::error::{ConfigError, ExecutorError};
use crate::metrics as m;
use crate::types::CommandOutput;

/// Exit status the OpenSSH client reserves for its own errors.
pub const SSH_TRANSPORT_EXIT_CODE: i32 = 255;

/// Trait abstracting remote command execution.
///
/// Implementations must be `Send + Sync + 'static` so a single executor can be
/// shared (`Arc`) between the runner and the probes it creates.
pub trait CommandExecutor: Send + Sync + 'static {
    /// Runs `command` through a shell on the target.
    ///
    /// # Errors
    ///
    /// Returns `ExecutorError` only when the command could not be run or did
    /// not finish in time. Non-zero exit codes are reported in the output.
    fn run(&self, command: &str)
    -> impl Future<Output = Result<CommandOutput, ExecutorError>> + Send;

    /// Human-readable target label (`root@10.0.0.5:22`, `localhost`).
    fn target(&self) -> &str;
}

impl<E: CommandExecutor> CommandExecutor for Arc<E> {
    fn run(
        &self,
        command: &str,
    ) -> impl Future<Output = Result<CommandOutput, ExecutorError>> + Send {
        (**self).run(command)
    }

    fn target(&self) -> &str {
        (**self).target()
    }
}

/// Executor that runs every command through the system `ssh` client.
///
/// Host keys are not verified: appliances are freshly instantiated VMs whose
/// keys are unknown ahead of time.
#[derive(Debug, Clone)]
pub struct SshExecutor {
    label: String,
    destination: String,
    options: Vec<String>,
    command_timeout: Duration,
}

impl SshExecutor {
    /// Builds an executor from the `[target]` section.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` when `host` is empty.
    pub fn from_config(config: &TargetConfig) -> Result<Self, ConfigError> {
        if config.host.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "target.host".to_owned(),
                reason: "host must be set (config, APPCERT_TARGET_HOST or --host)".to_owned(),
            });
        }

        let mut options = vec![
            "-o".to_owned(),
            "BatchMode=yes".to_owned(),
            "-o".to_owned(),
            "StrictHostKeyChecking=no".to_owned(),
            "-o".to_owned(),
            "UserKnownHostsFile=/dev/null".to_owned(),
            "-o".to_owned(),
            "LogLevel=ERROR".to_owned(),
            "-o".to_owned(),
            format!("ConnectTimeout={}", config.connect_timeout_secs),
            "-p".to_owned(),
            config.port.to_string(),
        ];
        if !config.ssh_key.is_empty() {
            options.push("-i".to_owned());
            options.push(config.ssh_key.clone());
        }
        for extra in &config.ssh_options {
            options.push("-o".to_owned());
            options.push(extra.clone());
        }

        Ok(Self {
            label: format!("{}@{}:{}", config.user, config.host, config.port),
            destination: format!("{}@{}", config.user, config.host),
            options,
            command_timeout: Duration::from_secs(config.command_timeout_secs),
        })
    }

    /// Full argument vector passed to `ssh` for `command`.
    pub fn ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = self.options.clone();
        args.push("--".to_owned());
        args.push(self.destination.clone());
        args.push(command.to_owned());
        args
    }
}

impl CommandExecutor for SshExecutor {
    async fn run(&self, command: &str) -> Result<CommandOutput, ExecutorError> {
        validate_command(command)?;
        let mut cmd = Command::new("ssh");
        cmd.args(self.ssh_args(command));

        let output = run_process(cmd, "ssh", command, self.command_timeout).await?;
        if output.exit_code == SSH_TRANSPORT_EXIT_CODE {
            metrics::counter!(m::EXECUTOR_COMMANDS_TOTAL, m::LABEL_RESULT => "transport_error")
                .increment(1);
            let reason = output.stderr.trim();
            return Err(ExecutorError::Transport {
                target: self.label.clone(),
                reason: if reason.is_empty() {
                    "ssh exited with status 255".to_owned()
                } else {
                    reason.to_owned()
                },
            });
        }
        Ok(output)
    }

    fn target(&self) -> &str {
        &self.label
    }
}

/// Executor that runs commands on this host via `sh -c`.
///
/// Used for dry runs and for running suites inside the appliance itself.
#[derive(Debug, Clone)]
pub struct LocalExecutor {
    command_timeout: Duration,
}

impl LocalExecutor {
    /// Creates a local executor with the given per-command timeout.
    pub fn new(command_timeout: Duration) -> Self {
        Self { command_timeout }
    }

    /// Builds a local executor from the `[target]` section.
    pub fn from_config(config: &TargetConfig) -> Self {
        Self::new(Duration::from_secs(config.command_timeout_secs))
    }
}

impl CommandExecutor for LocalExecutor {
    async fn run(&self, command: &str) -> Result<CommandOutput, ExecutorError> {
        validate_command(command)?;
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        run_process(cmd, "sh", command, self.command_timeout).await
    }

    fn target(&self) -> &str {
        "localhost"
    }
}

fn validate_command(command: &str) -> Result<(), ExecutorError> {
    if command.trim().is_empty() {
        return Err(ExecutorError::InvalidCommand(
            "command must not be empty".to_owned(),
        ));
    }
    if command.contains('\0') {
        return Err(ExecutorError::InvalidCommand(
            "command must not contain NUL bytes".to_owned(),
        ));
    }
    Ok(())
}

async fn run_process(
    mut cmd: Command,
    program: &str,
    command: &str,
    timeout: Duration,
) -> Result<CommandOutput, ExecutorError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let started = Instant::now();
    let child = cmd.spawn().map_err(|e| {
        metrics::counter!(m::EXECUTOR_COMMANDS_TOTAL, m::LABEL_RESULT => "spawn_error")
            .increment(1);
        ExecutorError::Spawn {
            program: program.to_owned(),
            reason: e.to_string(),
        }
    })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(ExecutorError::Spawn {
                program: program.to_owned(),
                reason: e.to_string(),
            });
        }
        Err(_) => {
            metrics::counter!(m::EXECUTOR_COMMANDS_TOTAL, m::LABEL_RESULT => "timeout")
                .increment(1);
            return Err(ExecutorError::Timeout {
                command: command.to_owned(),
                secs: timeout.as_secs(),
            });
        }
    };

    let duration = started.elapsed();
    let exit_code = output.status.code().unwrap_or(-1);
    debug!(
        program,
        command,
        exit_code,
        elapsed_ms = duration.as_millis() as u64,
        "command finished"
    );

    let result = if exit_code == 0 { "success" } else { "failure" };
    metrics::counter!(m::EXECUTOR_COMMANDS_TOTAL, m::LABEL_RESULT => result).increment(1);
    metrics::histogram!(m::EXECUTOR_COMMAND_DURATION_SECONDS).record(duration.as_secs_f64());

    Ok(CommandOutput {
        exit_code,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        duration,
    })
}
