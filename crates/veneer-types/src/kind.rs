//! File kinds.
//!
//! A file's kind is decided once, when the editor opens it, from the
//! language identifier the editor declares. Every later edit inherits it.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;

/// Classification of a file's content.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize, Default, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum FileKind {
    /// Language not recognized.
    #[default]
    Unknown,
    /// Program source (`.rs`, `.go`, `.proto`...).
    Source,
    /// Build manifest (`go.mod`, `Cargo.toml`).
    Manifest,
    /// Dependency lock/checksum file (`go.sum`, `Cargo.lock`).
    Lock,
    /// Text template.
    #[strum(serialize = "template", serialize = "tmpl")]
    Template,
    /// Multi-module workspace file (`go.work`).
    Workspace,
}

impl FileKind {
    /// Built-in mapping from an editor language identifier.
    ///
    /// Unrecognized identifiers map to [`FileKind::Unknown`].
    pub fn for_language(language_id: &str) -> Self {
        match language_id {
            "rust" | "go" | "proto" | "protobuf" => FileKind::Source,
            "go.mod" | "cargo-toml" => FileKind::Manifest,
            "go.sum" | "cargo-lock" => FileKind::Lock,
            "tmpl" | "gotmpl" => FileKind::Template,
            "go.work" => FileKind::Workspace,
            _ => FileKind::Unknown,
        }
    }

    /// Best-effort guess from a file name, for files read straight from disk
    /// (no editor has declared a language for them).
    pub fn for_file_name(name: &str) -> Self {
        match name {
            "go.mod" | "Cargo.toml" => return FileKind::Manifest,
            "go.sum" | "Cargo.lock" => return FileKind::Lock,
            "go.work" => return FileKind::Workspace,
            _ => {}
        }
        let Some((_, ext)) = name.rsplit_once('.') else {
            return FileKind::Unknown;
        };
        match ext {
            "rs" | "go" | "proto" => FileKind::Source,
            "tmpl" | "gotmpl" => FileKind::Template,
            _ => FileKind::Unknown,
        }
    }

    /// Parse from string (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Unknown => "unknown",
            FileKind::Source => "source",
            FileKind::Manifest => "manifest",
            FileKind::Lock => "lock",
            FileKind::Template => "template",
            FileKind::Workspace => "workspace",
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
