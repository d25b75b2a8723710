//! Document URIs.
//!
//! Editors identify files by URI. Most are `file://` URIs that map onto a
//! filesystem path; anything else (`untitled:`, `git:`...) is carried through
//! opaquely and simply has no path.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const FILE_SCHEME: &str = "file://";

/// A canonical document identifier.
///
/// Equality is plain string equality: callers are expected to hand in URIs
/// that were canonicalized the same way (see [`DocumentUri::from_path`]).
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentUri(String);

impl DocumentUri {
    /// Wrap an already-canonical URI string.
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    /// Build a `file://` URI from a filesystem path.
    ///
    /// Windows verbatim prefixes are stripped and separators normalized to
    /// `/`, so `C:\src\main.rs` becomes `file:///C:/src/main.rs`.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = dunce::simplified(path.as_ref());
        let mut text = path.to_string_lossy().replace('\\', "/");
        if !text.starts_with('/') {
            text.insert(0, '/');
        }
        Self(format!("{FILE_SCHEME}{text}"))
    }

    /// The URI as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is a `file://` URI.
    pub fn is_file(&self) -> bool {
        self.0.starts_with(FILE_SCHEME)
    }

    /// The filesystem path for a `file://` URI, `None` for any other scheme.
    pub fn to_path(&self) -> Option<PathBuf> {
        let rest = self.0.strip_prefix(FILE_SCHEME)?;
        if cfg!(windows) {
            // "/C:/x" -> "C:/x"
            if let Some(stripped) = rest.strip_prefix('/') {
                if stripped.get(1..2) == Some(":") {
                    return Some(PathBuf::from(stripped));
                }
            }
        }
        Some(PathBuf::from(rest))
    }

    /// The final path segment, if any. Used for extension-based guesses.
    pub fn file_name(&self) -> Option<&str> {
        self.0.rsplit('/').next().filter(|name| !name.is_empty())
    }
}

impl From<&str> for DocumentUri {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for DocumentUri {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for DocumentUri {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for DocumentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentUri({})", self.0)
    }
}
