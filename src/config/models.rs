//! Process settings for Gantry.
//!
//! These types map directly to a TOML (also JSON / YAML) settings file and to
//! `GANTRY_`-prefixed environment variables. Every field has a default, so an
//! empty or absent file yields a runnable gateway. Routes are not configured
//! here; they come from the uploaded manifest.
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MANIFEST_PATH: &str = "config/app.yaml";
pub const DEFAULT_MAX_MANIFEST_BYTES: usize = 2 * 1024 * 1024;
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

fn default_listen_addr() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}

fn default_manifest_path() -> String {
    DEFAULT_MANIFEST_PATH.to_string()
}

fn default_max_manifest_bytes() -> usize {
    DEFAULT_MAX_MANIFEST_BYTES
}

fn default_shutdown_timeout_secs() -> u64 {
    DEFAULT_SHUTDOWN_TIMEOUT_SECS
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

/// Logging output settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence when set
    #[serde(default = "default_log_level")]
    pub level: String,
    /// JSON lines when true, pretty console output otherwise
    #[serde(default = "default_true")]
    pub json: bool,
    /// Attach the current span and span list to JSON records
    #[serde(default)]
    pub include_spans: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: true,
            include_spans: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Where the last accepted manifest is persisted and reloaded from
    #[serde(default = "default_manifest_path")]
    pub manifest_path: String,
    /// Body limit for the upload endpoint
    #[serde(default = "default_max_manifest_bytes")]
    pub max_manifest_bytes: usize,
    /// How long in-flight requests may drain after a shutdown signal
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
    #[serde(default)]
    pub log: LogConfig,
}

impl GatewayConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            manifest_path: default_manifest_path(),
            max_manifest_bytes: DEFAULT_MAX_MANIFEST_BYTES,
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            log: LogConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.manifest_path, "config/app.yaml");
        assert_eq!(config.max_manifest_bytes, 2 * 1024 * 1024);
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(30));
        assert_eq!(config.log.level, "info");
        assert!(config.log.json);
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let config: GatewayConfig =
            serde_json::from_str(r#"{"listen_addr":"127.0.0.1:9000","log":{"json":false}}"#)
                .unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:9000");
        assert_eq!(config.manifest_path, DEFAULT_MANIFEST_PATH);
        assert!(!config.log.json);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_shutdown_timeout_from_seconds() {
        let config = GatewayConfig {
            shutdown_timeout_secs: 1,
            ..GatewayConfig::default()
        };
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(1));
    }
}
