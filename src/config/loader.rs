use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use eyre::{Context, Result};

use crate::config::models::GatewayConfig;

/// Settings file read when no `--config` is given. It may be absent.
pub const DEFAULT_CONFIG_FILE: &str = "gantry.toml";

/// Prefix of the environment variables that override file settings.
pub const ENV_PREFIX: &str = "GANTRY";

/// Load configuration from defaults, an optional settings file and the
/// environment, in increasing priority.
///
/// An explicitly named file must exist; the default file is optional.
/// Supports multiple formats: YAML, JSON, TOML, by extension.
pub fn load_config(config_path: Option<&str>) -> Result<GatewayConfig> {
    build_config(config_path, None)
}

fn build_config(
    config_path: Option<&str>,
    env_source: Option<config::Map<String, String>>,
) -> Result<GatewayConfig> {
    let (path, required) = match config_path {
        Some(path) => (path, true),
        None => (DEFAULT_CONFIG_FILE, false),
    };
    let config_path = Path::new(path);

    // Determine file format based on extension
    let format = match config_path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => FileFormat::Yaml,
        Some("json") => FileFormat::Json,
        _ => FileFormat::Toml,
    };

    let settings = Config::builder()
        .add_source(
            File::new(
                config_path
                    .to_str()
                    .ok_or_else(|| eyre::eyre!("Invalid UTF-8 path: {}", config_path.display()))?,
                format,
            )
            .required(required),
        )
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env_source),
        )
        .build()
        .with_context(|| format!("Failed to build config from {}", config_path.display()))?;

    let gateway_config: GatewayConfig = settings.try_deserialize().with_context(|| {
        format!(
            "Failed to deserialize config from {}",
            config_path.display()
        )
    })?;

    Ok(gateway_config)
}
