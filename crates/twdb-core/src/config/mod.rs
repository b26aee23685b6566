mod database;
mod logs;
mod server;

pub use database::PoolPolicy;
pub use logs::{LogLevel, LogsConfig, RotationPolicy};
pub use server::ServerDefaults;

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;

use crate::error::{MigrateError, Result};

/// Default location of the configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "../etc/db.yaml";

/// Key holding the MySQL connection string.
pub const KEY_MYSQL: &str = "MySQL";
/// Key holding the log severity name.
pub const KEY_LOG_LEVEL: &str = "Logs.LogLevel";
/// Key holding the active log file path.
pub const KEY_LOG_FILE: &str = "Logs.LogFile";

/// Document formats the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
    Json,
}

impl ConfigFormat {
    /// Pick a format from the file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            "toml" => Some(ConfigFormat::Toml),
            "json" => Some(ConfigFormat::Json),
            _ => None,
        }
    }
}

/// Immutable snapshot of the configuration file.
///
/// Nested mappings are flattened into dotted keys. Lookups are
/// case-insensitive, so `Logs.LogLevel` and `logs.loglevel` name the same
/// entry. No defaults are injected: a key that is absent stays absent until
/// a consumer asks for it.
#[derive(Debug, Clone, Default)]
pub struct MigrateConfig {
    entries: BTreeMap<String, String>,
}

impl MigrateConfig {
    /// Load configuration from a file, choosing the parser by extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            MigrateError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let format = ConfigFormat::from_path(path).ok_or_else(|| {
            MigrateError::Config(format!(
                "Unsupported config type for {}: expected .yaml, .yml, .toml or .json",
                path.display()
            ))
        })?;

        Self::parse_str(&content, format)
    }

    /// Parse configuration text in the given format.
    pub fn parse_str(content: &str, format: ConfigFormat) -> Result<Self> {
        let root: Value = match format {
            ConfigFormat::Yaml => serde_yaml::from_str(content)
                .map_err(|e| MigrateError::Config(format!("Failed to parse config: {}", e)))?,
            ConfigFormat::Toml => toml::from_str(content)
                .map_err(|e| MigrateError::Config(format!("Failed to parse config: {}", e)))?,
            ConfigFormat::Json => serde_json::from_str(content)
                .map_err(|e| MigrateError::Config(format!("Failed to parse config: {}", e)))?,
        };

        let Value::Object(map) = root else {
            return Err(MigrateError::Config(
                "Failed to parse config: top level must be a mapping".to_string(),
            ));
        };

        let mut entries = BTreeMap::new();
        for (key, value) in map {
            flatten_into(&mut entries, &key.to_lowercase(), value);
        }

        tracing::debug!(keys = entries.len(), "configuration loaded");
        Ok(Self { entries })
    }

    /// Look up a dotted key, ignoring case.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(&key.to_lowercase()).map(String::as_str)
    }

    /// Look up a key that a later phase cannot do without.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| MigrateError::Config(format!("Missing required key: {}", key)))
    }

    /// The MySQL connection string.
    pub fn mysql_dsn(&self) -> Result<&str> {
        self.require(KEY_MYSQL)
    }

    /// The logging section, with the level name already parsed.
    pub fn logs(&self) -> Result<LogsConfig> {
        let level = self.require(KEY_LOG_LEVEL)?.parse::<LogLevel>()?;
        let file = self.require(KEY_LOG_FILE)?;
        Ok(LogsConfig {
            level,
            file: file.into(),
            rotation: RotationPolicy::default(),
        })
    }

    /// Number of leaf entries in the snapshot.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn flatten_into(entries: &mut BTreeMap<String, String>, prefix: &str, value: Value) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let key = format!("{}.{}", prefix, key.to_lowercase());
                flatten_into(entries, &key, child);
            }
        }
        Value::String(s) => {
            entries.insert(prefix.to_string(), s);
        }
        Value::Null => {
            entries.insert(prefix.to_string(), String::new());
        }
        other => {
            entries.insert(prefix.to_string(), other.to_string());
        }
    }
}
