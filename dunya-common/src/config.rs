//! Bootstrap configuration loading
//!
//! The TOML file only carries bootstrap concerns: the optional Redis host,
//! logging, and default option values handed to extractor modules.
//!
//! ```toml
//! redis_host = "localhost"
//!
//! [logging]
//! level = "info"
//!
//! [settings]           # every module
//! [modules.checksum]   # one module slug, overrides [settings]
//! block_size = 65536
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable consulted for the Redis host
pub const REDIS_HOST_ENV: &str = "DUNYA_REDIS_HOST";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Redis host used as the shared cache backend (optional)
    #[serde(default)]
    pub redis_host: Option<String>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Options applied to every module
    #[serde(default)]
    pub settings: toml::Table,

    /// Options applied to a single module, keyed by module slug
    #[serde(default)]
    pub modules: BTreeMap<String, toml::Table>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Module options for `slug`: the global `[settings]` table overlaid
    /// with `[modules.<slug>]`, converted to JSON values.
    pub fn module_settings(&self, slug: &str) -> Result<serde_json::Map<String, serde_json::Value>> {
        let mut merged = serde_json::Map::new();

        let tables = std::iter::once(&self.settings).chain(self.modules.get(slug));
        for table in tables {
            for (name, value) in table {
                let value = serde_json::to_value(value).map_err(|e| {
                    Error::Config(format!("Setting '{}' is not representable: {}", name, e))
                })?;
                merged.insert(name.clone(), value);
            }
        }

        Ok(merged)
    }
}

/// Default configuration file path for the platform
///
/// `<config_dir>/dunya/extractors.toml` (e.g. `~/.config/dunya/extractors.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("dunya").join("extractors.toml"))
}

/// Parse a TOML configuration file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load configuration, degrading to defaults when no file exists
///
/// A missing file is not an error: a warning is logged and defaults are
/// returned. A file that exists but fails to parse is an error.
pub fn load_or_default(path: Option<&Path>) -> Result<TomlConfig> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match default_config_path() {
            Some(p) => p,
            None => {
                warn!("Could not determine config directory, using default configuration");
                return Ok(TomlConfig::default());
            }
        },
    };

    if !path.exists() {
        warn!(
            "Config file {} not found, using default configuration",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let config = load_toml_config(&path)?;
    debug!(path = %path.display(), "Loaded bootstrap configuration");
    Ok(config)
}

/// Resolve the Redis host
///
/// **Priority:** command line → environment variable → TOML.
/// Blank values are ignored. `None` selects the local cache.
pub fn resolve_redis_host(
    cli_arg: Option<&str>,
    env_var_name: &str,
    toml_config: &TomlConfig,
) -> Option<String> {
    let candidates = [
        ("command line", cli_arg.map(str::to_string)),
        ("environment", std::env::var(env_var_name).ok()),
        ("TOML", toml_config.redis_host.clone()),
    ];

    let valid: Vec<(&str, String)> = candidates
        .into_iter()
        .filter_map(|(source, value)| {
            value
                .filter(|v| !v.trim().is_empty())
                .map(|v| (source, v.trim().to_string()))
        })
        .collect();

    if valid.len() > 1 {
        let sources: Vec<&str> = valid.iter().map(|(s, _)| *s).collect();
        warn!(
            "Redis host found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    let (source, host) = valid.into_iter().next()?;
    info!("Redis host loaded from {}", source);
    Some(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_defaults_to_info() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.file.is_none());
        assert!(config.redis_host.is_none());
    }

    #[test]
    fn test_module_settings_override_global() {
        let config: TomlConfig = toml::from_str(
            r#"
            [settings]
            block_size = 1024
            label = "global"

            [modules.checksum]
            block_size = 4096
            "#,
        )
        .unwrap();

        let checksum = config.module_settings("checksum").unwrap();
        assert_eq!(checksum["block_size"], serde_json::json!(4096));
        assert_eq!(checksum["label"], serde_json::json!("global"));

        let other = config.module_settings("tags").unwrap();
        assert_eq!(other["block_size"], serde_json::json!(1024));
    }
}
