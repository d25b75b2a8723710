//! File handles: a point-in-time view of one file.

use std::fmt;
use std::sync::Arc;

use veneer_types::{ContentHash, DocumentUri, FileIdentity, FileKind};

use crate::error::{SourceError, SourceResult};

/// A read-only view of a file as some source saw it.
///
/// Handles are snapshots. Holding one never keeps a source's state alive or
/// current; read again to observe later changes.
pub trait FileHandle: Send + Sync + fmt::Debug {
    fn uri(&self) -> &DocumentUri;

    /// URI plus content hash.
    fn identity(&self) -> FileIdentity;

    /// The file's bytes, or the error that prevented reading them.
    fn content(&self) -> SourceResult<&[u8]>;

    /// Editor protocol version; 0 for anything not owned by an editor.
    fn version(&self) -> i32;

    /// Whether these bytes are known to match what is on disk.
    fn same_contents_on_disk(&self) -> bool;

    fn kind(&self) -> FileKind;
}

/// Shared handle type returned by every [`FileSource`](crate::FileSource).
pub type FileHandleRef = Arc<dyn FileHandle>;

/// A file as read from a backing store.
#[derive(Debug, Clone)]
pub struct DiskFile {
    uri: DocumentUri,
    content: Vec<u8>,
    hash: ContentHash,
    kind: FileKind,
}

impl DiskFile {
    /// Wrap freshly read bytes. The kind is guessed from the file name.
    pub fn new(uri: DocumentUri, content: Vec<u8>) -> Self {
        let hash = ContentHash::of(&content);
        let kind = uri
            .file_name()
            .map(FileKind::for_file_name)
            .unwrap_or_default();
        Self {
            uri,
            content,
            hash,
            kind,
        }
    }

    pub fn hash(&self) -> ContentHash {
        self.hash
    }
}

impl FileHandle for DiskFile {
    fn uri(&self) -> &DocumentUri {
        &self.uri
    }

    fn identity(&self) -> FileIdentity {
        FileIdentity::new(self.uri.clone(), self.hash)
    }

    fn content(&self) -> SourceResult<&[u8]> {
        Ok(&self.content)
    }

    fn version(&self) -> i32 {
        0
    }

    fn same_contents_on_disk(&self) -> bool {
        true
    }

    fn kind(&self) -> FileKind {
        self.kind
    }
}

/// An unexpected failure to read a file, wrapped up as a handle.
///
/// Reconciliation reads cannot propagate their errors (the overlay update
/// must go on), so a failed read becomes a `BrokenFile`: zero identity hash,
/// never matches disk, and `content()` returns the read error.
#[derive(Debug, Clone)]
pub struct BrokenFile {
    uri: DocumentUri,
    error: SourceError,
}

impl BrokenFile {
    pub fn new(uri: DocumentUri, error: SourceError) -> Self {
        Self { uri, error }
    }

    pub fn error(&self) -> &SourceError {
        &self.error
    }
}

impl FileHandle for BrokenFile {
    fn uri(&self) -> &DocumentUri {
        &self.uri
    }

    fn identity(&self) -> FileIdentity {
        FileIdentity::new(self.uri.clone(), ContentHash::ZERO)
    }

    fn content(&self) -> SourceResult<&[u8]> {
        Err(self.error.clone())
    }

    fn version(&self) -> i32 {
        0
    }

    fn same_contents_on_disk(&self) -> bool {
        false
    }

    fn kind(&self) -> FileKind {
        FileKind::Unknown
    }
}
