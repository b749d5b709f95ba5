//! Reader for the `synchro.conf` key/value file.
//!
//! The file has a single implicit section:
//!
//! ```text
//! # comment
//! destination = user@box:/srv/data
//! tar = y
//! untar: y
//! ```
//!
//! Section headers are tolerated and ignored. Later keys override earlier ones.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Default configuration file name looked up inside a source directory.
pub const DEFAULT_CONFIG_FILE: &str = "synchro.conf";

/// Parsed configuration keys, lowercased, last assignment wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigMap {
    path: Option<PathBuf>,
    entries: BTreeMap<String, String>,
}

impl ConfigMap {
    /// Read and parse the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;
        let mut map = Self::parse(&contents);
        map.path = Some(path.to_path_buf());
        Ok(map)
    }

    /// Parse configuration text that is already in memory.
    pub fn parse(contents: &str) -> Self {
        let mut entries = BTreeMap::new();
        for raw in contents.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                continue;
            }
            let Some((key, value)) = split_entry(line) else {
                continue;
            };
            entries.insert(key.to_ascii_lowercase(), value.to_owned());
        }
        Self {
            path: None,
            entries,
        }
    }

    /// Path the map was loaded from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Boolean view of a key: `Some(true)` only for the literal `y`,
    /// `Some(false)` for any other value, `None` when the key is absent.
    pub fn flag(&self, key: &str) -> Option<bool> {
        self.get(key).map(|value| value == "y")
    }
}

/// Split `key = value` or `key: value` on whichever delimiter comes first.
fn split_entry(line: &str) -> Option<(&str, &str)> {
    let idx = line.find(&['=', ':'][..])?;
    let key = line[..idx].trim();
    if key.is_empty() {
        return None;
    }
    Some((key, line[idx + 1..].trim()))
}
