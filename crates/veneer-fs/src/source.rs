//! The file-source capability.

use std::sync::Arc;

use async_trait::async_trait;
use veneer_types::DocumentUri;

use crate::context::ReadContext;
use crate::error::SourceResult;
use crate::handle::{BrokenFile, FileHandleRef};

/// Anything that can produce a [`FileHandle`](crate::FileHandle) for a URI.
///
/// Implemented by the disk and memory backends, and by
/// [`OverlayFs`](crate::OverlayFs) itself, so an overlay store can stand in
/// wherever a plain source is expected.
#[async_trait]
pub trait FileSource: Send + Sync {
    /// Read `uri`.
    ///
    /// Sources should abandon the read with
    /// [`SourceError::Cancelled`](crate::SourceError::Cancelled) if `cx` is
    /// cancelled, and must never do so for a detached context.
    async fn read_file(&self, cx: &ReadContext, uri: &DocumentUri) -> SourceResult<FileHandleRef>;
}

#[async_trait]
impl<S: FileSource + ?Sized> FileSource for Arc<S> {
    async fn read_file(&self, cx: &ReadContext, uri: &DocumentUri) -> SourceResult<FileHandleRef> {
        (**self).read_file(cx, uri).await
    }
}

/// Read `uri` with a detached context, never failing.
///
/// Errors come back as a [`BrokenFile`] so the caller can fold them into a
/// "does not match disk" decision instead of aborting.
pub async fn must_read_file(source: &dyn FileSource, uri: &DocumentUri) -> FileHandleRef {
    match source.read_file(&ReadContext::detached(), uri).await {
        Ok(fh) => fh,
        Err(error) => {
            tracing::debug!(%uri, %error, "reconciliation read failed");
            Arc::new(BrokenFile::new(uri.clone(), error))
        }
    }
}
