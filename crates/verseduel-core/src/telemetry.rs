//! Tracing setup for duel runs.

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::VerseDuelError;

static INSTALLED: OnceLock<()> = OnceLock::new();

/// Filter directives for a duel process: `RUST_LOG` wins when set, otherwise
/// the configured level applies to the binary and the core crate alike.
fn filter_directives(logging: &LoggingConfig) -> String {
    std::env::var("RUST_LOG")
        .ok()
        .filter(|directives| !directives.trim().is_empty())
        .unwrap_or_else(|| format!("{level},verseduel_core={level}", level = logging.level))
}

/// Install the global tracing subscriber from the `[logging]` config section.
///
/// Safe to call more than once; only the first call installs.
pub fn init_telemetry(logging: &LoggingConfig) -> Result<(), VerseDuelError> {
    if INSTALLED.get().is_some() {
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter_directives(logging)))
        .with_target(false)
        .try_init()
        .map_err(|err| {
            VerseDuelError::InvalidConfiguration(format!(
                "unable to install tracing subscriber: {err}"
            ))
        })?;

    INSTALLED.get_or_init(|| ());
    Ok(())
}
