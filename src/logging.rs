//! Tracing subscriber setup shared by the binaries

use crate::config::LoggingConfig;
use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` still applies; each of `targets` gets the configured level on
/// top of it.
pub fn init(config: &LoggingConfig, targets: &[&str]) -> Result<()> {
    let mut filter = EnvFilter::from_default_env();
    for target in targets {
        filter = filter.add_directive(format!("{}={}", target, config.level).parse()?);
    }

    let installed = match config.format.as_str() {
        "json" => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init(),
        _ => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
    };

    installed.map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}
