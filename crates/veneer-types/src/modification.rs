//! Decoded editor change events.
//!
//! A [`Modification`] is one lifecycle notification about one file: the
//! editor opened, changed, saved or closed it, or a filesystem watcher saw it
//! change on disk. The transport layer decodes its wire format into these;
//! the overlay store consumes them in order.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::uri::DocumentUri;

/// What happened to a file.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize, Default, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum FileAction {
    #[default]
    Unknown,
    /// Editor opened the file; carries text and a language identifier.
    Open,
    /// Editor buffer changed, or (with `on_disk`) the watcher saw a write.
    Change,
    /// Editor closed the file.
    Close,
    /// Editor saved the buffer; text is optional.
    Save,
    /// Watcher saw the file created.
    Create,
    /// Watcher saw the file deleted.
    Delete,
}

impl FileAction {
    /// Parse from string (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileAction::Unknown => "unknown",
            FileAction::Open => "open",
            FileAction::Change => "change",
            FileAction::Close => "close",
            FileAction::Save => "save",
            FileAction::Create => "create",
            FileAction::Delete => "delete",
        }
    }
}

impl std::fmt::Display for FileAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One decoded change event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modification {
    pub uri: DocumentUri,
    pub action: FileAction,

    /// Originated from a filesystem watcher rather than the editor.
    #[serde(default)]
    pub on_disk: bool,

    /// Editor protocol version; 0 when the event carries none.
    #[serde(default)]
    pub version: i32,

    /// New buffer text, if the event carries any.
    #[serde(default, with = "opt_text", skip_serializing_if = "Option::is_none")]
    pub text: Option<Vec<u8>>,

    /// Editor language identifier (only meaningful for `Open`).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub language_id: String,
}

impl Modification {
    fn new(uri: DocumentUri, action: FileAction) -> Self {
        Self {
            uri,
            action,
            on_disk: false,
            version: 0,
            text: None,
            language_id: String::new(),
        }
    }

    /// Editor opened `uri` at `version` with `text`.
    pub fn open(
        uri: impl Into<DocumentUri>,
        version: i32,
        text: impl Into<Vec<u8>>,
        language_id: impl Into<String>,
    ) -> Self {
        Self {
            version,
            text: Some(text.into()),
            language_id: language_id.into(),
            ..Self::new(uri.into(), FileAction::Open)
        }
    }

    /// Editor buffer for `uri` now holds `text` at `version`.
    pub fn change(uri: impl Into<DocumentUri>, version: i32, text: impl Into<Vec<u8>>) -> Self {
        Self {
            version,
            text: Some(text.into()),
            ..Self::new(uri.into(), FileAction::Change)
        }
    }

    /// Editor saved `uri`. Attach the saved text with [`Modification::with_text`].
    pub fn save(uri: impl Into<DocumentUri>) -> Self {
        Self::new(uri.into(), FileAction::Save)
    }

    /// Editor closed `uri`.
    pub fn close(uri: impl Into<DocumentUri>) -> Self {
        Self::new(uri.into(), FileAction::Close)
    }

    /// Filesystem watcher event for `uri`. Carries neither text nor version.
    pub fn on_disk(uri: impl Into<DocumentUri>, action: FileAction) -> Self {
        Self {
            on_disk: true,
            ..Self::new(uri.into(), action)
        }
    }

    /// Attach text to the event.
    pub fn with_text(mut self, text: impl Into<Vec<u8>>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Attach a protocol version to the event.
    pub fn with_version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }
}

/// Text travels as a UTF-8 string on the wire and as bytes in memory.
/// Serializing non-UTF-8 bytes is an error rather than a lossy rewrite.
mod opt_text {
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(text: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match text {
            Some(bytes) => {
                let text = std::str::from_utf8(bytes).map_err(S::Error::custom)?;
                s.serialize_some(text)
            }
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        Ok(Option::<String>::deserialize(d)?.map(String::into_bytes))
    }
}
