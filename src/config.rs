//! # Configuration Module
//!
//! Application defaults, loaded from environment variables or a YAML document.
//!
//! ## Environment Variables
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `TREEROUTE_DEFAULT_RESPONSE` | `json`, `plain_text` or `html` | `json` |
//! | `TREEROUTE_VALIDATE_RESPONSES` | check return values against response models | `true` |
//! | `TREEROUTE_LOG_LEVEL` | trace/debug/info/warn/error | `info` |
//! | `TREEROUTE_LOG_FORMAT` | `json` or `pretty` | `json` |
//!
//! ## YAML
//!
//! ```yaml
//! default_response_kind: plain_text
//! validate_responses: false
//! log:
//!   level: debug
//!   format: pretty
//! ```
//!
//! Every field is optional.

use std::env;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::response::ResponseKind;

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Logging configuration consumed by [`crate::logging::init_logging`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level: trace/debug/info/warn/error
    pub level: String,
    pub format: LogFormat,
    /// Extra `EnvFilter` directives, comma-separated
    pub target_filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
            target_filter: None,
        }
    }
}

impl LogConfig {
    pub fn from_env() -> Self {
        Self {
            level: env::var("TREEROUTE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: LogFormat::parse(
                &env::var("TREEROUTE_LOG_FORMAT").unwrap_or_else(|_| "json".to_string()),
            ),
            target_filter: env::var("TREEROUTE_LOG_TARGET_FILTER").ok(),
        }
    }

    /// Human-readable output at debug level.
    pub fn default_dev() -> Self {
        Self {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            target_filter: None,
        }
    }
}

/// Application-wide defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Response kind used when neither the route nor its router declares one
    pub default_response_kind: ResponseKind,
    /// Validate plain handler return values against the route's response model
    pub validate_responses: bool,
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_response_kind: ResponseKind::Json,
            validate_responses: true,
            log: LogConfig::default(),
        }
    }
}

fn parse_kind(s: &str) -> ResponseKind {
    match s.to_lowercase().as_str() {
        "plain_text" | "text" => ResponseKind::PlainText,
        "html" => ResponseKind::Html,
        _ => ResponseKind::Json,
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            default_response_kind: env::var("TREEROUTE_DEFAULT_RESPONSE")
                .map(|v| parse_kind(&v))
                .unwrap_or_default(),
            validate_responses: env::var("TREEROUTE_VALIDATE_RESPONSES")
                .map(|v| !matches!(v.to_lowercase().as_str(), "0" | "false" | "off"))
                .unwrap_or(true),
            log: LogConfig::from_env(),
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).context("Failed to parse application config")
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&text)
    }
}
