//! Target selection: ssh to `[target]` or run locally.

use std::sync::Arc;

use appcert_core::config::AppcertConfig;
use appcert_core::error::ExecutorError;
use appcert_core::executor::{CommandExecutor, LocalExecutor, SshExecutor};
use appcert_core::types::CommandOutput;

use crate::cli::TargetArgs;
use crate::error::CliError;

/// The executor chosen from config and command-line flags.
pub enum Target {
    Ssh(SshExecutor),
    Local(LocalExecutor),
}

impl Target {
    /// Build the executor. `--local` wins, then `--host`, then `[target].host`.
    pub fn resolve(config: &AppcertConfig, args: &TargetArgs) -> Result<Arc<Self>, CliError> {
        if args.local {
            return Ok(Arc::new(Self::Local(LocalExecutor::from_config(
                &config.target,
            ))));
        }

        let mut target = config.target.clone();
        if let Some(host) = &args.host {
            target.host = host.clone();
        }
        let ssh = SshExecutor::from_config(&target).map_err(|e| CliError::Config(e.to_string()))?;
        Ok(Arc::new(Self::Ssh(ssh)))
    }
}

impl CommandExecutor for Target {
    async fn run(&self, command: &str) -> Result<CommandOutput, ExecutorError> {
        match self {
            Self::Ssh(ssh) => ssh.run(command).await,
            Self::Local(local) => local.run(command).await,
        }
    }

    fn target(&self) -> &str {
        match self {
            Self::Ssh(ssh) => ssh.target(),
            Self::Local(local) => local.target(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_flag_selects_local_executor() {
        let config = AppcertConfig::default();
        let args = TargetArgs {
            host: None,
            local: true,
        };
        let target = Target::resolve(&config, &args).expect("local target");
        assert!(matches!(*target, Target::Local(_)));
    }

    #[test]
    fn test_missing_host_is_config_error() {
        let config = AppcertConfig::default();
        let err = Target::resolve(&config, &TargetArgs::default())
            .err()
            .expect("host is required for ssh");
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("target.host"));
    }

    #[test]
    fn test_host_flag_overrides_config() {
        let mut config = AppcertConfig::default();
        config.target.host = "10.0.0.1".to_owned();
        let args = TargetArgs {
            host: Some("10.0.0.7".to_owned()),
            local: false,
        };
        let target = Target::resolve(&config, &args).expect("ssh target");
        assert!(target.target().contains("10.0.0.7"), "{}", target.target());
    }

    #[test]
    fn test_local_flag_ignores_configured_host() {
        let mut config = AppcertConfig::default();
        config.target.host = "10.0.0.1".to_owned();
        let args = TargetArgs {
            host: None,
            local: true,
        };
        let target = Target::resolve(&config, &args).expect("local target");
        assert_eq!(target.target(), "localhost");
    }
}
