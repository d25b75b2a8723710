//! Overlay store: editor buffers layered over a delegate file source.
//!
//! [`OverlayFs`] keeps one [`Overlay`] per file the editor has open. Reads
//! prefer the overlay and fall back to the delegate. Change batches are
//! applied under a single lock, in order, and fail fast on the first event
//! that contradicts what the store knows.
//!
//! ## Design Decisions
//!
//! - **Copy-on-write records**: an `Overlay` is never mutated. Each event
//!   builds a fresh record and swaps the `Arc` in the map, so a reader holds
//!   either the old record or the new one, never a mix.
//! - **One lock, map only**: the mutex guards exactly the URI → overlay map.
//!   Readers hold it just long enough to clone an `Arc`.
//! - **Detached reconciliation**: deciding whether an overlay matches disk
//!   reads the delegate with [`ReadContext::detached`]. Skipping that read
//!   would silently misreport `saved`.
//! - **Batches outlive their caller**: `apply_changes` runs the batch on a
//!   spawned task and awaits its `JoinHandle`. Dropping a `JoinHandle` does
//!   not cancel the task, so a batch is never cut short between events.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::Instrument;
use veneer_types::{ContentHash, DocumentUri, FileAction, FileIdentity, FileKind, Modification};

use crate::config::OverlayConfig;
use crate::context::ReadContext;
use crate::error::{OverlayError, OverlayResult, SourceResult};
use crate::handle::{FileHandle, FileHandleRef};
use crate::source::{FileSource, must_read_file};

/// A file open in the editor. It may have unsaved edits.
#[derive(Debug, Clone)]
pub struct Overlay {
    uri: DocumentUri,
    content: Option<Arc<[u8]>>,
    hash: ContentHash,
    version: i32,
    kind: FileKind,
    /// True if the content matches the state on disk, and therefore does not
    /// need to be handed to external tools as an unsaved buffer.
    saved: bool,
}

impl Overlay {
    pub fn uri(&self) -> &DocumentUri {
        &self.uri
    }

    /// The buffer text, or `None` if the event that produced this record
    /// carried none.
    pub fn text(&self) -> Option<&[u8]> {
        self.content.as_deref()
    }

    pub fn hash(&self) -> ContentHash {
        self.hash
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }

    pub fn saved(&self) -> bool {
        self.saved
    }
}

impl FileHandle for Overlay {
    fn uri(&self) -> &DocumentUri {
        &self.uri
    }

    fn identity(&self) -> FileIdentity {
        FileIdentity::new(self.uri.clone(), self.hash)
    }

    fn content(&self) -> SourceResult<&[u8]> {
        Ok(self.text().unwrap_or_default())
    }

    fn version(&self) -> i32 {
        self.version
    }

    fn same_contents_on_disk(&self) -> bool {
        self.saved
    }

    fn kind(&self) -> FileKind {
        self.kind
    }
}

/// A [`FileSource`] that tracks editor overlays on top of a delegate source.
///
/// Cheap to clone; clones share the same overlays.
#[derive(Clone)]
pub struct OverlayFs {
    inner: Arc<Store>,
}

/// State shared between the handle and in-flight batches.
struct Store {
    delegate: Arc<dyn FileSource>,
    config: OverlayConfig,
    overlays: Mutex<HashMap<DocumentUri, Arc<Overlay>>>,
}

impl OverlayFs {
    /// Create an overlay store with default configuration.
    pub fn new(delegate: Arc<dyn FileSource>) -> Self {
        Self::with_config(delegate, OverlayConfig::default())
    }

    pub fn with_config(delegate: Arc<dyn FileSource>, config: OverlayConfig) -> Self {
        Self {
            inner: Arc::new(Store {
                delegate,
                config,
                overlays: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Get the delegate source.
    pub fn delegate(&self) -> &Arc<dyn FileSource> {
        &self.inner.delegate
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.inner.config
    }

    /// Read `uri`, preferring an open overlay over the delegate.
    ///
    /// Never mutates the store. The lock is released before the delegate is
    /// consulted, and the delegate sees the caller's context unchanged.
    #[tracing::instrument(skip_all, name = "overlay.read_file", fields(uri = %uri))]
    pub async fn read_file(&self, cx: &ReadContext, uri: &DocumentUri) -> SourceResult<FileHandleRef> {
        let overlay = self.inner.overlays.lock().await.get(uri).cloned();
        if let Some(overlay) = overlay {
            return Ok(overlay as FileHandleRef);
        }
        self.inner.delegate.read_file(cx, uri).await
    }

    /// A new unordered list of the current overlays.
    pub async fn overlays(&self) -> Vec<Arc<Overlay>> {
        self.inner.overlays.lock().await.values().cloned().collect()
    }

    /// The overlay for `uri`, without falling back to the delegate.
    pub async fn overlay(&self, uri: &DocumentUri) -> Option<Arc<Overlay>> {
        self.inner.overlays.lock().await.get(uri).cloned()
    }

    /// Overlays whose content is not known to match disk, sorted by URI.
    pub async fn unsaved_overlays(&self) -> Vec<Arc<Overlay>> {
        let mut unsaved: Vec<_> = self
            .inner
            .overlays
            .lock()
            .await
            .values()
            .filter(|o| !o.saved)
            .cloned()
            .collect();
        unsaved.sort_by(|a, b| a.uri.cmp(&b.uri));
        unsaved
    }

    /// Unsaved `file://` overlays keyed by filesystem path.
    ///
    /// This is the set of buffers an external analysis run must be handed
    /// in place of what it would find on disk.
    pub async fn overlay_contents(&self) -> BTreeMap<PathBuf, Vec<u8>> {
        self.unsaved_overlays()
            .await
            .into_iter()
            .filter_map(|o| {
                let path = o.uri.to_path()?;
                Some((path, o.text().unwrap_or_default().to_vec()))
            })
            .collect()
    }

    /// Number of open overlays.
    pub async fn len(&self) -> usize {
        self.inner.overlays.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.overlays.lock().await.is_empty()
    }

    /// Apply a batch of change events, in order.
    ///
    /// The lock is held for the whole batch. On the first inconsistent event
    /// the call returns its error; events before it stay applied and events
    /// after it are not processed.
    ///
    /// The batch runs on its own task. Dropping the returned future, say on a
    /// timeout, does not stop it: the batch still runs to completion or to
    /// its first failure.
    /// Must be called from within a tokio runtime.
    #[tracing::instrument(skip_all, name = "overlay.apply_changes", fields(changes = changes.len()))]
    pub async fn apply_changes(&self, changes: &[Modification]) -> OverlayResult<()> {
        let store = Arc::clone(&self.inner);
        let changes = changes.to_vec();
        let batch = tokio::spawn(
            async move { store.apply_batch(&changes).await }.instrument(tracing::Span::current()),
        );

        match batch.await {
            Ok(result) => result,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => {
                tracing::warn!(error = %err, "overlay batch task cancelled");
                Err(OverlayError::Interrupted)
            }
        }
    }
}

impl Store {
    async fn apply_batch(&self, changes: &[Modification]) -> OverlayResult<()> {
        let mut overlays = self.overlays.lock().await;

        for (index, change) in changes.iter().enumerate() {
            if let Err(err) = self.apply_one(&mut overlays, change).await {
                tracing::warn!(
                    index,
                    uri = %change.uri,
                    action = %change.action,
                    error = %err,
                    "aborting overlay batch"
                );
                return Err(err);
            }
        }

        Ok(())
    }

    async fn apply_one(
        &self,
        overlays: &mut HashMap<DocumentUri, Arc<Overlay>>,
        c: &Modification,
    ) -> OverlayResult<()> {
        let existing = overlays.get(&c.uri).cloned();

        // Disk changes to files nobody has open have nothing to reconcile.
        if existing.is_none() && c.on_disk {
            tracing::trace!(uri = %c.uri, action = %c.action, "ignoring on-disk change to unopened file");
            return Ok(());
        }

        // Kind is fixed at open and inherited afterwards.
        let kind = match (c.action, &existing) {
            (FileAction::Open, _) => self.config.kind_for_language(&c.language_id),
            (_, Some(o)) => o.kind,
            (_, None) => return Err(unopened_error(c)),
        };

        if c.action == FileAction::Close {
            overlays.remove(&c.uri);
            tracing::debug!(uri = %c.uri, "closed overlay");
            return Ok(());
        }

        // Saves and on-disk changes don't come with the file's content.
        let content: Option<Arc<[u8]>> = match (&c.text, &existing) {
            (Some(text), _) => Some(Arc::from(text.as_slice())),
            (None, Some(o)) if c.action == FileAction::Save || c.on_disk => o.content.clone(),
            (None, _) => None,
        };

        // Neither do they come with versions.
        let version = match &existing {
            Some(o) if c.on_disk || c.action == FileAction::Save => o.version,
            _ => c.version,
        };

        let hash = ContentHash::of(content.as_deref().unwrap_or_default());

        let saved = match c.action {
            FileAction::Delete => false,
            FileAction::Save => {
                if let Some(o) = &existing {
                    if c.text.is_some() && o.hash != hash {
                        return Err(OverlayError::ChangedOnSave { uri: c.uri.clone() });
                    }
                    if self.config.verify_save_version && c.version != 0 && c.version != o.version {
                        return Err(OverlayError::VersionMismatchOnSave {
                            uri: c.uri.clone(),
                            saved: c.version,
                            current: o.version,
                        });
                    }
                }
                true
            }
            _ => self.matches_disk(&c.uri, hash).await,
        };

        tracing::debug!(
            uri = %c.uri,
            action = %c.action,
            on_disk = c.on_disk,
            version,
            hash = %hash.short(),
            saved,
            "updated overlay"
        );

        overlays.insert(
            c.uri.clone(),
            Arc::new(Overlay {
                uri: c.uri.clone(),
                content,
                hash,
                version,
                kind,
                saved,
            }),
        );

        Ok(())
    }

    /// Whether the delegate currently holds exactly the bytes hashed as `hash`.
    async fn matches_disk(&self, uri: &DocumentUri, hash: ContentHash) -> bool {
        let fh = must_read_file(self.delegate.as_ref(), uri).await;
        fh.content().is_ok() && fh.identity().hash == hash
    }
}

/// Error for a non-open event on a file with no overlay.
///
/// A textless edit has nothing to build a record from, so it reports missing
/// content; anything else (text-carrying edits, closes) reports the file as
/// unopened.
fn unopened_error(c: &Modification) -> OverlayError {
    if c.text.is_none() && c.action != FileAction::Close {
        OverlayError::NoKnownContent {
            uri: c.uri.clone(),
            action: c.action,
        }
    } else {
        OverlayError::ModifyingUnopened { uri: c.uri.clone() }
    }
}

impl std::fmt::Debug for OverlayFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayFs")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl FileSource for OverlayFs {
    async fn read_file(&self, cx: &ReadContext, uri: &DocumentUri) -> SourceResult<FileHandleRef> {
        OverlayFs::read_file(self, cx, uri).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemorySource;

    const URI: &str = "file:///ws/main.go";

    fn store_with(disk: &[(&str, &str)]) -> (OverlayFs, Arc<MemorySource>) {
        let source = Arc::new(MemorySource::new());
        for (uri, text) in disk {
            source.insert(*uri, *text);
        }
        (OverlayFs::new(source.clone()), source)
    }

    fn uri() -> DocumentUri {
        DocumentUri::new(URI)
    }

    #[tokio::test]
    async fn open_creates_overlay_with_declared_kind() {
        let (fs, _) = store_with(&[]);
        fs.apply_changes(&[Modification::open(URI, 1, "package main", "go")])
            .await
            .unwrap();

        let o = fs.overlay(&uri()).await.unwrap();
        assert_eq!(o.text(), Some(&b"package main"[..]));
        assert_eq!(o.hash(), ContentHash::of(b"package main"));
        assert_eq!(o.version(), 1);
        assert_eq!(o.kind(), FileKind::Source);
        assert!(!o.saved(), "nothing on disk");
    }

    #[tokio::test]
    async fn open_matching_disk_is_saved() {
        let (fs, _) = store_with(&[(URI, "package main")]);
        fs.apply_changes(&[Modification::open(URI, 1, "package main", "go")])
            .await
            .unwrap();
        assert!(fs.overlay(&uri()).await.unwrap().saved());
    }

    #[tokio::test]
    async fn change_inherits_kind() {
        let (fs, _) = store_with(&[]);
        fs.apply_changes(&[
            Modification::open(URI, 1, "a", "go.mod"),
            Modification::change(URI, 2, "ab"),
        ])
        .await
        .unwrap();

        let o = fs.overlay(&uri()).await.unwrap();
        assert_eq!(o.kind(), FileKind::Manifest);
        assert_eq!(o.version(), 2);
    }

    #[tokio::test]
    async fn config_overrides_language_kind() {
        let source = Arc::new(MemorySource::new());
        let config = OverlayConfig::default().with_language("proto3", FileKind::Source);
        let fs = OverlayFs::with_config(source, config);
        fs.apply_changes(&[Modification::open(URI, 1, "syntax = \"proto3\";", "proto3")])
            .await
            .unwrap();
        assert_eq!(fs.overlay(&uri()).await.unwrap().kind(), FileKind::Source);
    }

    #[tokio::test]
    async fn close_removes_overlay() {
        let (fs, _) = store_with(&[]);
        fs.apply_changes(&[
            Modification::open(URI, 1, "x", "go"),
            Modification::close(URI),
        ])
        .await
        .unwrap();
        assert!(fs.is_empty().await);
    }

    #[tokio::test]
    async fn on_disk_change_without_overlay_is_skipped() {
        let (fs, source) = store_with(&[(URI, "x")]);
        fs.apply_changes(&[Modification::on_disk(URI, FileAction::Change)])
            .await
            .unwrap();
        assert!(fs.is_empty().await);
        assert_eq!(source.read_count(), 0);
    }

    #[tokio::test]
    async fn on_disk_change_rechecks_saved_flag() {
        let (fs, source) = store_with(&[(URI, "old")]);
        fs.apply_changes(&[Modification::open(URI, 3, "new", "go")])
            .await
            .unwrap();
        assert!(!fs.overlay(&uri()).await.unwrap().saved());

        // Something wrote the buffer's content to disk behind the editor's back.
        source.insert(URI, "new");
        fs.apply_changes(&[Modification::on_disk(URI, FileAction::Change)])
            .await
            .unwrap();

        let o = fs.overlay(&uri()).await.unwrap();
        assert!(o.saved());
        assert_eq!(o.text(), Some(&b"new"[..]));
        assert_eq!(o.version(), 3, "on-disk events keep the editor version");
    }

    #[tokio::test]
    async fn on_disk_delete_forces_unsaved() {
        let (fs, _) = store_with(&[(URI, "x")]);
        fs.apply_changes(&[
            Modification::open(URI, 1, "x", "go"),
            Modification::on_disk(URI, FileAction::Delete),
        ])
        .await
        .unwrap();
        let o = fs.overlay(&uri()).await.unwrap();
        assert!(!o.saved());
        assert_eq!(o.text(), Some(&b"x"[..]));
    }

    #[tokio::test]
    async fn save_without_text_reuses_content_and_version() {
        let (fs, _) = store_with(&[]);
        fs.apply_changes(&[
            Modification::open(URI, 1, "a", "go"),
            Modification::change(URI, 2, "ab"),
            Modification::save(URI),
        ])
        .await
        .unwrap();

        let o = fs.overlay(&uri()).await.unwrap();
        assert_eq!(o.text(), Some(&b"ab"[..]));
        assert_eq!(o.version(), 2);
        assert!(o.saved());
    }

    #[tokio::test]
    async fn save_with_different_text_fails() {
        let (fs, _) = store_with(&[]);
        fs.apply_changes(&[Modification::open(URI, 1, "y", "go")])
            .await
            .unwrap();

        let err = fs
            .apply_changes(&[Modification::save(URI).with_text("x")])
            .await
            .unwrap_err();
        assert_eq!(err, OverlayError::ChangedOnSave { uri: uri() });
        assert!(err.to_string().contains("changed on save"));

        // The failed save left the previous record alone.
        let o = fs.overlay(&uri()).await.unwrap();
        assert_eq!(o.text(), Some(&b"y"[..]));
        assert!(!o.saved());
    }

    #[tokio::test]
    async fn save_version_is_ignored_by_default() {
        let (fs, _) = store_with(&[]);
        fs.apply_changes(&[
            Modification::open(URI, 4, "x", "go"),
            Modification::save(URI).with_version(9),
        ])
        .await
        .unwrap();
        assert_eq!(fs.overlay(&uri()).await.unwrap().version(), 4);
    }

    #[tokio::test]
    async fn save_version_checked_when_enabled() {
        let source = Arc::new(MemorySource::new());
        let fs = OverlayFs::with_config(
            source,
            OverlayConfig::default().with_verify_save_version(true),
        );
        fs.apply_changes(&[Modification::open(URI, 4, "x", "go")])
            .await
            .unwrap();

        // Versionless saves still pass.
        fs.apply_changes(&[Modification::save(URI)]).await.unwrap();

        let err = fs
            .apply_changes(&[Modification::save(URI).with_version(9)])
            .await
            .unwrap_err();
        assert!(err.is_stale_write());
        assert!(matches!(
            err,
            OverlayError::VersionMismatchOnSave { saved: 9, current: 4, .. }
        ));
    }

    #[tokio::test]
    async fn change_without_overlay_fails() {
        let (fs, _) = store_with(&[]);
        let err = fs
            .apply_changes(&[Modification::change(URI, 1, "x")])
            .await
            .unwrap_err();
        assert_eq!(err, OverlayError::ModifyingUnopened { uri: uri() });
        assert!(fs.overlay(&uri()).await.is_none());
    }

    #[tokio::test]
    async fn close_without_overlay_fails() {
        let (fs, _) = store_with(&[]);
        let err = fs.apply_changes(&[Modification::close(URI)]).await.unwrap_err();
        assert_eq!(err, OverlayError::ModifyingUnopened { uri: uri() });
    }

    #[tokio::test]
    async fn textless_events_without_overlay_have_no_content() {
        let (fs, _) = store_with(&[]);
        for action in [FileAction::Change, FileAction::Save] {
            let change = Modification {
                uri: uri(),
                action,
                on_disk: false,
                version: 0,
                text: None,
                language_id: String::new(),
            };
            let err = fs.apply_changes(&[change]).await.unwrap_err();
            assert_eq!(err, OverlayError::NoKnownContent { uri: uri(), action });
        }
        assert!(fs.is_empty().await);
    }

    /// Holds reads of one URI until released.
    struct GatedSource {
        inner: MemorySource,
        gated: DocumentUri,
        gate: tokio::sync::Notify,
    }

    #[async_trait]
    impl FileSource for GatedSource {
        async fn read_file(&self, cx: &ReadContext, uri: &DocumentUri) -> SourceResult<FileHandleRef> {
            if *uri == self.gated {
                self.gate.notified().await;
            }
            self.inner.read_file(cx, uri).await
        }
    }

    #[tokio::test]
    async fn dropped_apply_future_still_finishes_batch() {
        let other = DocumentUri::new("file:///ws/other.go");
        let source = Arc::new(GatedSource {
            inner: MemorySource::new().with_file(URI, "a"),
            gated: uri(),
            gate: tokio::sync::Notify::new(),
        });
        let fs = OverlayFs::new(source.clone());

        let changes = [
            Modification::open(URI, 1, "a", "go"),
            Modification::open(other.clone(), 1, "b", "go"),
        ];
        // Poll once so the batch starts, then drop the caller's future.
        tokio::select! {
            biased;
            _ = fs.apply_changes(&changes) => panic!("batch cannot finish while gated"),
            _ = std::future::ready(()) => {}
        }

        // Wait for the batch task to take the lock, then let its read finish.
        while fs.inner.overlays.try_lock().is_ok() {
            tokio::task::yield_now().await;
        }
        source.gate.notify_one();
        assert_eq!(fs.len().await, 2, "both events applied after the caller left");
        assert!(fs.overlay(&uri()).await.unwrap().saved());
        assert!(!fs.overlay(&other).await.unwrap().saved());
    }

    #[tokio::test]
    async fn failure_keeps_earlier_events_and_skips_later_ones() {
        let (fs, _) = store_with(&[]);
        let other = "file:///ws/other.go";
        let err = fs
            .apply_changes(&[
                Modification::open(URI, 1, "a", "go"),
                Modification::change(other, 1, "nope"),
                Modification::change(URI, 2, "ab"),
            ])
            .await
            .unwrap_err();
        assert_eq!(err.uri().map(DocumentUri::as_str), Some(other));

        let o = fs.overlay(&uri()).await.unwrap();
        assert_eq!(o.text(), Some(&b"a"[..]), "third event must not run");
        assert_eq!(fs.len().await, 1);
    }

    #[tokio::test]
    async fn read_prefers_overlay_and_skips_delegate() {
        let (fs, source) = store_with(&[(URI, "disk")]);
        fs.apply_changes(&[Modification::open(URI, 1, "buffer", "go")])
            .await
            .unwrap();
        let reads_after_open = source.read_count();

        let fh = fs.read_file(&ReadContext::detached(), &uri()).await.unwrap();
        assert_eq!(fh.content().unwrap(), b"buffer");
        assert_eq!(fh.version(), 1);
        assert_eq!(source.read_count(), reads_after_open);
    }

    #[tokio::test]
    async fn read_falls_back_to_delegate() {
        let (fs, source) = store_with(&[(URI, "disk")]);
        let fh = fs.read_file(&ReadContext::detached(), &uri()).await.unwrap();
        assert_eq!(fh.content().unwrap(), b"disk");
        assert_eq!(source.read_count(), 1);

        let missing = DocumentUri::new("file:///ws/missing.go");
        let err = fs
            .read_file(&ReadContext::detached(), &missing)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(fs.is_empty().await, "read errors are never cached");
    }

    #[tokio::test]
    async fn unsaved_overlays_are_sorted_and_exported() {
        let (fs, _) = store_with(&[("file:///ws/b.go", "same")]);
        fs.apply_changes(&[
            Modification::open("file:///ws/c.go", 1, "c", "go"),
            Modification::open("file:///ws/b.go", 1, "same", "go"),
            Modification::open("file:///ws/a.go", 1, "a", "go"),
            Modification::open("untitled:1", 1, "scratch", "go"),
        ])
        .await
        .unwrap();

        let uris: Vec<_> = fs
            .unsaved_overlays()
            .await
            .iter()
            .map(|o| o.uri().to_string())
            .collect();
        assert_eq!(uris, ["file:///ws/a.go", "file:///ws/c.go", "untitled:1"]);
        assert_eq!(fs.overlays().await.len(), 4);

        let contents = fs.overlay_contents().await;
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[&PathBuf::from("/ws/a.go")], b"a");
        assert_eq!(contents[&PathBuf::from("/ws/c.go")], b"c");
    }

    #[tokio::test]
    async fn overlay_fs_composes_as_a_source() {
        let (inner, _) = store_with(&[]);
        inner
            .apply_changes(&[Modification::open(URI, 1, "inner", "go")])
            .await
            .unwrap();
        let outer = OverlayFs::new(Arc::new(inner));

        // The inner overlay is "disk" for the outer store.
        outer
            .apply_changes(&[Modification::open(URI, 7, "inner", "go")])
            .await
            .unwrap();
        let o = outer.overlay(&uri()).await.unwrap();
        assert!(o.saved());
        assert_eq!(o.version(), 7);
    }
}
