//! Error types for reads and overlay updates.

use std::io;
use std::sync::Arc;

use thiserror::Error;
use veneer_types::{DocumentUri, FileAction};

/// Errors from reading a file through a [`FileSource`](crate::FileSource).
///
/// `Clone` so that a [`BrokenFile`](crate::BrokenFile) can hand the same
/// error back from every `content()` call. Read errors are never cached by
/// the overlay store.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// Neither an overlay nor the delegate knows this file.
    #[error("not found: {0}")]
    NotFound(DocumentUri),

    /// The URI cannot be served by this source (wrong scheme, malformed).
    #[error("invalid uri: {0}")]
    InvalidUri(String),

    /// The URI resolves outside the source's root directory.
    #[error("{0} is outside the source root")]
    OutsideRoot(DocumentUri),

    /// The caller cancelled the read before it completed.
    #[error("read of {0} cancelled")]
    Cancelled(DocumentUri),

    /// I/O error.
    #[error("I/O error reading {uri}: {source}")]
    Io {
        uri: DocumentUri,
        #[source]
        source: Arc<io::Error>,
    },
}

impl SourceError {
    /// Create a NotFound error.
    pub fn not_found(uri: &DocumentUri) -> Self {
        Self::NotFound(uri.clone())
    }

    /// Create an InvalidUri error.
    pub fn invalid_uri(uri: impl Into<String>) -> Self {
        Self::InvalidUri(uri.into())
    }

    /// Create a Cancelled error.
    pub fn cancelled(uri: &DocumentUri) -> Self {
        Self::Cancelled(uri.clone())
    }

    /// Map an I/O error, turning `NotFound` into [`SourceError::NotFound`].
    pub fn io(uri: &DocumentUri, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            Self::not_found(uri)
        } else {
            Self::Io {
                uri: uri.clone(),
                source: Arc::new(err),
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

/// Result alias for file-source reads.
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors that abort an overlay update batch.
///
/// Apart from [`OverlayError::Interrupted`], every variant means the upstream
/// event stream is inconsistent with what the store knows. Callers should
/// surface these, not retry them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OverlayError {
    /// A non-open event referenced a file with no overlay.
    #[error("modifying unopened overlay {uri}")]
    ModifyingUnopened { uri: DocumentUri },

    /// The event carried no text and there is no prior overlay to reuse.
    #[error("no known content for overlay for {action}: {uri}")]
    NoKnownContent { uri: DocumentUri, action: FileAction },

    /// A save carried text whose hash differs from the last known buffer.
    #[error("overlay {uri} changed on save")]
    ChangedOnSave { uri: DocumentUri },

    /// A save carried a version other than the overlay's current one.
    /// Only raised when `verify_save_version` is enabled.
    #[error("saving {uri} at version {saved}, currently at {current}")]
    VersionMismatchOnSave {
        uri: DocumentUri,
        saved: i32,
        current: i32,
    },

    /// The runtime shut down before the batch task finished. Events applied
    /// before that point stay applied.
    #[error("overlay batch interrupted by runtime shutdown")]
    Interrupted,
}

impl OverlayError {
    /// The URI of the event that failed, if a single event did.
    pub fn uri(&self) -> Option<&DocumentUri> {
        match self {
            Self::ModifyingUnopened { uri }
            | Self::NoKnownContent { uri, .. }
            | Self::ChangedOnSave { uri }
            | Self::VersionMismatchOnSave { uri, .. } => Some(uri),
            Self::Interrupted => None,
        }
    }

    /// An event referenced state the store never saw (unopened file, no content).
    pub fn is_protocol_inconsistency(&self) -> bool {
        matches!(
            self,
            Self::ModifyingUnopened { .. } | Self::NoKnownContent { .. }
        )
    }

    /// A save disagreed with the last known buffer (lost or reordered update).
    pub fn is_stale_write(&self) -> bool {
        matches!(
            self,
            Self::ChangedOnSave { .. } | Self::VersionMismatchOnSave { .. }
        )
    }
}

/// Result alias for overlay updates.
pub type OverlayResult<T> = Result<T, OverlayError>;
