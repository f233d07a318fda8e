// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor-wide options.
//!
//! [`EditorOptions`] travels inside every document under `"options"`.
//! [`EditorSettings`] wraps the same options with a format version so they
//! can also be kept in a RON file next to the user's documents.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Current settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// Settings file name
pub const SETTINGS_FILE_NAME: &str = "editor_settings.ron";

/// Settings errors
#[derive(Debug, Error)]
pub enum SettingsError {
    /// File could not be read or written
    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid RON
    #[error("Settings parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Settings could not be encoded
    #[error("Settings encode error: {0}")]
    Encode(#[from] ron::Error),

    /// File written by a newer editor
    #[error("Settings version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Newest version this build reads
        supported: u32,
    },
}

/// Options stored with each document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorOptions {
    /// Whether executed commands are kept for undo
    pub history_enabled: bool,
    /// Window in which repeated edits of one field collapse into one entry
    pub merge_window_ms: u64,
    /// Maximum number of kept history entries
    pub history_limit: usize,
    /// Save materials with the document
    pub save_material: bool,
    /// Save child nodes of catalog models with the document
    pub save_child: bool,
    /// Asset server base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    /// Options the core does not interpret
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            history_enabled: true,
            merge_window_ms: 500,
            history_limit: 100,
            save_material: true,
            save_child: true,
            server: None,
            extra: BTreeMap::new(),
        }
    }
}

/// Versioned options file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorSettings {
    /// Settings format version
    pub version: u32,
    /// Options applied to new documents
    #[serde(default)]
    pub options: EditorOptions,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_FORMAT_VERSION,
            options: EditorOptions::default(),
        }
    }
}

impl EditorSettings {
    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        let settings = Self::from_ron(&content)?;
        tracing::info!("Loaded editor settings from {:?}", path);
        Ok(settings)
    }

    /// Load settings from a file, falling back to defaults when it is missing
    pub fn load_or_default(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            tracing::debug!("No settings at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Parse settings text
    pub fn from_ron(content: &str) -> Result<Self, SettingsError> {
        let settings: EditorSettings = ron::from_str(content)?;
        if settings.version > SETTINGS_FORMAT_VERSION {
            return Err(SettingsError::UnsupportedVersion {
                found: settings.version,
                supported: SETTINGS_FORMAT_VERSION,
            });
        }
        Ok(settings)
    }

    /// Encode settings as pretty RON
    pub fn to_ron(&self) -> Result<String, SettingsError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        std::fs::write(path, self.to_ron()?)?;
        tracing::info!("Saved editor settings to {:?}", path);
        Ok(())
    }
}
