//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{AgentConfig, LogFormat};

/// Install the global subscriber
///
/// `RUST_LOG` wins over `level_override`, which wins over the configured level.
/// Logs go to stderr so command output on stdout stays machine-readable.
///
/// # Errors
/// Returns error if the level is not a valid filter or a subscriber is already set
pub fn init(config: &AgentConfig, level_override: Option<&str>) -> eyre::Result<()> {
    let level = level_override.unwrap_or(&config.log_level);
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()?,
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()?,
    }
    Ok(())
}
