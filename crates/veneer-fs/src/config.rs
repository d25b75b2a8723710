//! Overlay store configuration.
//!
//! Loaded from TOML:
//!
//! ```toml
//! verify_save_version = false
//!
//! [languages]
//! proto3 = "source"
//! "cargo-toml" = "manifest"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use veneer_types::FileKind;

/// Errors loading an [`OverlayConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid overlay config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Tunables for [`OverlayFs`](crate::OverlayFs).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Reject saves whose version differs from the overlay's current version.
    ///
    /// Off by default: most editors do not send a version with save
    /// notifications. Only enable for clients known to do so.
    #[serde(default)]
    pub verify_save_version: bool,

    /// Language identifier → kind overrides, consulted before the built-in map.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub languages: BTreeMap<String, FileKind>,
}

impl OverlayConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Map a language identifier to a kind.
    pub fn with_language(mut self, language_id: impl Into<String>, kind: FileKind) -> Self {
        self.languages.insert(language_id.into(), kind);
        self
    }

    /// Set save-version verification.
    pub fn with_verify_save_version(mut self, verify: bool) -> Self {
        self.verify_save_version = verify;
        self
    }

    /// Resolve the kind for an editor language identifier.
    pub fn kind_for_language(&self, language_id: &str) -> FileKind {
        self.languages
            .get(language_id)
            .copied()
            .unwrap_or_else(|| FileKind::for_language(language_id))
    }
}
