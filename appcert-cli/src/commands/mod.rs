//! Command handlers -- one module per subcommand

pub mod config;
pub mod run;
pub mod suites;
pub mod wait;

use std::path::Path;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use appcert_core::config::{AppcertConfig, GeneralConfig};

use crate::error::CliError;

/// Load the effective configuration.
///
/// A missing file is not an error: defaults plus `APPCERT_*` environment
/// overrides are used instead, so `appcert wait --local ...` works without a
/// config file. Parse and validation errors are reported as-is.
pub async fn load_config(path: &Path) -> Result<AppcertConfig, CliError> {
    if tokio::fs::try_exists(path).await? {
        return Ok(AppcertConfig::load(path).await?);
    }

    info!(path = %path.display(), "config file not found, using defaults");
    let mut config = AppcertConfig::default();
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

/// Resolve the `[general]` section before logging is initialized.
///
/// Same precedence as [`load_config`] (env over file over defaults). Never
/// fails: an unreadable or invalid config yields defaults, and the command
/// reports the real error once logging is up.
pub async fn load_general(path: &Path) -> GeneralConfig {
    let mut config = AppcertConfig::from_file(path).await.unwrap_or_default();
    config.apply_env_overrides();
    match config.validate() {
        Ok(()) => config.general,
        Err(_) => GeneralConfig::default(),
    }
}

/// Token cancelled on the first Ctrl-C.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("interrupt received, cancelling");
                child.cancel();
            }
            Err(e) => warn!(error = %e, "failed to listen for ctrl-c"),
        }
    });
    token
}
