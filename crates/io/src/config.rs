//! Reader configuration via `hepstore.toml`
//!
//! Readers take a [`ReaderConfig`]; applications usually keep it next to
//! their data as `hepstore.toml`. A commented default file can be written on
//! first use and edited afterwards.

use hepstore_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file name
pub const CONFIG_FILE_NAME: &str = "hepstore.toml";

/// How frames are read back
///
/// # Example
///
/// ```toml
/// strict_references = true
/// seal_registry = true
/// collections = ["hits", "clusters"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Fail the read when a relation target cannot be found.
    /// When `false` the target becomes an unavailable handle.
    #[serde(default = "default_true")]
    pub strict_references: bool,
    /// Only read the named collections (default: all).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collections: Option<Vec<String>>,
    /// Seal the process-wide evolution registry before the first read.
    #[serde(default = "default_true")]
    pub seal_registry: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            strict_references: true,
            collections: None,
            seal_registry: true,
        }
    }
}

impl ReaderConfig {
    /// Whether the collection `name` is selected for reading
    pub fn wants(&self, name: &str) -> bool {
        self.collections
            .as_ref()
            .map_or(true, |names| names.iter().any(|n| n == name))
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# hepstore reader configuration
#
# Fail a read when a relation points at a record that is not in the frame.
# When false, such targets are read back as unavailable handles.
strict_references = true

# Close the schema evolution registry before the first read. Registrations
# after that point are rejected.
seal_registry = true

# Only read these collections (default: all).
# collections = ["hits", "clusters"]
"#
    }

    /// Parse config from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse reader config: {}", e)))
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize reader config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
