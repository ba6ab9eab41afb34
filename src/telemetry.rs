//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::config::Log;
use crate::{Error, Result};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `log.level` when set. Fails when the configured
/// filter does not parse or a global subscriber is already installed.
pub fn init(log: &Log) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&log.level)
            .map_err(|e| Error::Config(format!("Invalid log level '{}': {e}", log.level)))?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = if log.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| Error::Config(format!("Failed to install tracing subscriber: {e}")))
}
