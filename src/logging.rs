//! Structured logging setup.
//!
//! The dispatch core only emits `tracing` events. Applications that want them
//! printed install a subscriber once at startup with [`init_logging`].

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::{LogConfig, LogFormat};

static INSTALLED: OnceCell<()> = OnceCell::new();

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Install the global subscriber described by `config`.
///
/// `RUST_LOG` overrides the configured level when set. Calling this again
/// after a successful install is a no-op.
///
/// ```no_run
/// use treeroute::{logging, LogConfig};
///
/// logging::init_logging(&LogConfig::from_env()).expect("Failed to initialize logging");
/// ```
pub fn init_logging(config: &LogConfig) -> Result<()> {
    INSTALLED
        .get_or_try_init(|| {
            let level = parse_level(&config.level);
            let mut env_filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(level.as_str()));

            if let Some(target_filter) = &config.target_filter {
                for directive in target_filter.split(',').map(str::trim).filter(|d| !d.is_empty()) {
                    match directive.parse() {
                        Ok(d) => env_filter = env_filter.add_directive(d),
                        Err(_) => eprintln!("Warning: Invalid log filter directive: {}", directive),
                    }
                }
            }

            let fmt_layer = match config.format {
                LogFormat::Json => tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true)
                    .with_span_list(true)
                    .boxed(),
                LogFormat::Pretty => tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_ids(false)
                    .boxed(),
            };

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()
                .context("Failed to initialize logging")
        })
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parse() {
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("nonsense"), Level::INFO);
    }

    #[test]
    fn test_second_install_is_a_no_op() {
        let config = LogConfig::default_dev();
        let first = init_logging(&config);
        // Another test harness subscriber may already be installed; either
        // way a repeated call after success must not fail.
        if first.is_ok() {
            assert!(init_logging(&config).is_ok());
        }
    }
}
