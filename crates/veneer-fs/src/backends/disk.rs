//! Local filesystem source.
//!
//! Serves `file://` URIs straight from disk, optionally confined to a root
//! directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use veneer_types::DocumentUri;

use crate::context::ReadContext;
use crate::error::{SourceError, SourceResult};
use crate::handle::{DiskFile, FileHandleRef};
use crate::source::FileSource;

/// Local filesystem source.
///
/// With a root, any URI that resolves outside it (through `..` or a symlink)
/// is refused with [`SourceError::OutsideRoot`].
#[derive(Debug, Clone, Default)]
pub struct DiskSource {
    root: Option<PathBuf>,
}

impl DiskSource {
    /// A source that serves any `file://` URI.
    pub fn new() -> Self {
        Self { root: None }
    }

    /// A source confined to `root`.
    ///
    /// The root is canonicalized at construction time to handle symlinks
    /// (e.g. macOS `/tmp` → `/private/tmp`).
    pub fn rooted(root: impl Into<PathBuf>) -> Self {
        let root: PathBuf = root.into();
        let root = dunce::canonicalize(&root).unwrap_or(root);
        Self { root: Some(root) }
    }

    /// Get the root path, if confined.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Map a URI to a path on disk, enforcing the root.
    ///
    /// With a root, the returned path is the canonical one that was checked,
    /// so the read cannot be redirected after the check.
    fn resolve(&self, uri: &DocumentUri) -> SourceResult<PathBuf> {
        let path = uri
            .to_path()
            .ok_or_else(|| SourceError::invalid_uri(uri.as_str()))?;

        let Some(root) = &self.root else {
            return Ok(path);
        };

        let resolved = match dunce::canonicalize(&path) {
            Ok(resolved) => resolved,
            // Missing file: confine its parent; the read then reports NotFound.
            Err(_) => {
                let parent = path.parent().and_then(|p| dunce::canonicalize(p).ok());
                match (parent, path.file_name()) {
                    (Some(parent), Some(name)) => parent.join(name),
                    _ => return Err(SourceError::not_found(uri)),
                }
            }
        };

        if !resolved.starts_with(root) {
            return Err(SourceError::OutsideRoot(uri.clone()));
        }
        Ok(resolved)
    }
}

#[async_trait]
impl FileSource for DiskSource {
    async fn read_file(&self, cx: &ReadContext, uri: &DocumentUri) -> SourceResult<FileHandleRef> {
        let path = self.resolve(uri)?;

        let bytes = tokio::select! {
            biased;
            _ = cx.cancelled() => return Err(SourceError::cancelled(uri)),
            res = fs::read(&path) => res.map_err(|e| SourceError::io(uri, e))?,
        };

        tracing::trace!(%uri, len = bytes.len(), "read from disk");
        Ok(Arc::new(DiskFile::new(uri.clone(), bytes)) as FileHandleRef)
    }
}
