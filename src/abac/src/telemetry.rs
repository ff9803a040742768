//! Tracing subscriber setup

use crate::config::LoggingConfig;
use crate::error::{AbacError, Result};
use tracing_subscriber::EnvFilter;

/// Install a global `fmt` subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Fails if a global
/// subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},scribe_abac={}", config.level, config.level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target)
        .with_thread_ids(config.with_thread_ids)
        .with_line_number(true)
        .try_init()
        .map_err(|e| AbacError::Internal(format!("failed to install tracing subscriber: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_reports_error() {
        let config = LoggingConfig::default();

        // Another test may already have installed a subscriber
        let _ = init_tracing(&config);
        let err = init_tracing(&config).unwrap_err();
        assert!(matches!(err, AbacError::Internal(_)));
    }
}
