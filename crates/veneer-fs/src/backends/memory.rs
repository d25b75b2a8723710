//! In-memory file source.
//!
//! Used for testing and for embedders whose "disk" is not a filesystem.
//! All data is ephemeral.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use veneer_types::DocumentUri;

use crate::context::ReadContext;
use crate::error::{SourceError, SourceResult};
use crate::handle::{DiskFile, FileHandleRef};
use crate::source::FileSource;

/// In-memory file source.
///
/// Thread-safe via internal `RwLock`. Counts the reads it serves so tests
/// can assert when a delegate was (or was not) consulted.
#[derive(Debug, Default)]
pub struct MemorySource {
    files: RwLock<HashMap<DocumentUri, Arc<DiskFile>>>,
    reads: AtomicUsize,
}

impl MemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`MemorySource::insert`].
    pub fn with_file(self, uri: impl Into<DocumentUri>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(uri, content);
        self
    }

    /// Create or replace a file.
    pub fn insert(&self, uri: impl Into<DocumentUri>, content: impl Into<Vec<u8>>) {
        let uri = uri.into();
        let file = Arc::new(DiskFile::new(uri.clone(), content.into()));
        self.files.write().insert(uri, file);
    }

    /// Remove a file, returning whether it existed.
    pub fn remove(&self, uri: &DocumentUri) -> bool {
        self.files.write().remove(uri).is_some()
    }

    pub fn contains(&self, uri: &DocumentUri) -> bool {
        self.files.read().contains_key(uri)
    }

    /// Number of `read_file` calls served so far (hits and misses).
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl FileSource for MemorySource {
    async fn read_file(&self, cx: &ReadContext, uri: &DocumentUri) -> SourceResult<FileHandleRef> {
        if cx.is_cancelled() {
            return Err(SourceError::cancelled(uri));
        }
        self.reads.fetch_add(1, Ordering::Relaxed);

        let file = self.files.read().get(uri).cloned();
        match file {
            Some(file) => Ok(file as FileHandleRef),
            None => Err(SourceError::not_found(uri)),
        }
    }
}
