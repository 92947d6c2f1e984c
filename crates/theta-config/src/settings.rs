/*
 * settings.rs
 * Copyright (c) 2026 Theta contributors
 */

//! Sources of workspace-level configuration defaults.
//!
//! The configuration model itself never touches the filesystem or the editor;
//! it reads the workspace layer through [`WorkspaceSettings`]. The command
//! line loads a YAML settings file, embedders implement the trait over their
//! own settings store, and tests use [`MemorySettings`].

use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::keys;

/// A source of workspace-level settings, keyed by the camelCase names in
/// [`keys`](crate::keys).
pub trait WorkspaceSettings {
    /// Look up a setting by key. `None` means the workspace does not set it.
    fn get(&self, key: &str) -> Option<JsonValue>;
}

/// The templates root configured in the workspace, if any.
pub fn templates_path(settings: &dyn WorkspaceSettings) -> Option<PathBuf> {
    settings
        .get(keys::TEMPLATES_PATH)
        .and_then(|value| value.as_str().map(PathBuf::from))
}

/// In-memory settings source.
#[derive(Debug, Default, Clone)]
pub struct MemorySettings {
    values: HashMap<String, JsonValue>,
}

impl MemorySettings {
    /// Create an empty settings source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a single value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) {
        self.values.insert(key.into(), value.into());
    }

    /// Builder-style variant of [`set`](Self::set).
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.set(key, value);
        self
    }
}

impl WorkspaceSettings for MemorySettings {
    fn get(&self, key: &str) -> Option<JsonValue> {
        self.values.get(key).cloned()
    }
}

/// Failure to load a settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Settings loaded from a YAML file holding a flat mapping of key to value.
#[derive(Debug, Default, Clone)]
pub struct FileSettings {
    values: serde_json::Map<String, JsonValue>,
}

impl FileSettings {
    /// Load settings from a YAML file.
    ///
    /// A file whose top level is not a mapping yields an empty settings set;
    /// the per-field merge tolerates every value shape, so no further
    /// validation happens here.
    pub fn load(path: &Path) -> Result<FileSettings, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed: JsonValue =
            serde_yaml::from_str(&text).map_err(|source| SettingsError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let values = match parsed {
            JsonValue::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        Ok(FileSettings { values })
    }
}

impl WorkspaceSettings for FileSettings {
    fn get(&self, key: &str) -> Option<JsonValue> {
        self.values.get(key).cloned()
    }
}
