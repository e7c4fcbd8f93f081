//! Configuration loading for the conversion config file
//!
//! The file is parsed as JSON5 so that game config files with comments and
//! trailing commas load unchanged. Every table is required; a missing table
//! aborts the run before any tile is resolved.

use super::schema::ConversionConfig;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Root key holding the conversion tables.
pub const CONFIG_ROOT: &str = "worldToTiled";

/// Tables that must be present under the root.
pub const REQUIRED_TABLES: [&str; 4] = ["material", "mod", "liquid", "wire"];

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// JSON5 parsing error
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    /// Required table or root object absent
    #[error("Config is missing required key '{0}'")]
    Missing(String),
    /// Table present but of the wrong shape
    #[error("Config table '{table}' is invalid: {source}")]
    Invalid {
        table: String,
        #[source]
        source: serde_json::Error,
    },
    /// An object carries connections on a pin the wire table does not know
    #[error("Config has no wire offset for pin '{pin}' of object '{object}'")]
    MissingWireOffset { object: String, pin: String },
}

/// Load the conversion config from a file.
///
/// # Returns
/// - `Ok(ConversionConfig)` on success
/// - `Err(ConfigError)` if the file cannot be read, parsed, or lacks a table
pub fn load_config(path: &Path) -> Result<ConversionConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse the conversion config from a JSON5 string.
pub fn parse_config(contents: &str) -> Result<ConversionConfig, ConfigError> {
    let document: Value = json5::from_str(contents)?;
    let root = document
        .get(CONFIG_ROOT)
        .and_then(Value::as_object)
        .ok_or_else(|| ConfigError::Missing(CONFIG_ROOT.to_string()))?;

    for table in REQUIRED_TABLES {
        if !root.contains_key(table) {
            return Err(ConfigError::Missing(format!("{}.{}", CONFIG_ROOT, table)));
        }
    }

    Ok(ConversionConfig {
        material: table(root, "material")?,
        mods: table(root, "mod")?,
        liquid: table(root, "liquid")?,
        wire: table(root, "wire")?,
    })
}

fn table<T: DeserializeOwned>(root: &Map<String, Value>, name: &str) -> Result<T, ConfigError> {
    serde_json::from_value(root[name].clone()).map_err(|source| ConfigError::Invalid {
        table: name.to_string(),
        source,
    })
}
