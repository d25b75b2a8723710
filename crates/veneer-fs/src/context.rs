//! Read contexts: whether a read may be cancelled by its caller.
//!
//! Two kinds of read go through a [`FileSource`](crate::FileSource):
//!
//! - **Caller reads** (`OverlayFs::read_file` falling back to disk) carry the
//!   caller's [`CancellationToken`] and may be abandoned when it fires.
//! - **Reconciliation reads** (checking whether an overlay matches disk while
//!   applying changes) must always complete, or the overlay's `saved` flag
//!   would be wrong. They run with [`ReadContext::detached`].

use tokio_util::sync::CancellationToken;

/// Cancellation policy for a single read.
#[derive(Debug, Clone, Default)]
pub struct ReadContext {
    cancel: Option<CancellationToken>,
}

impl ReadContext {
    /// A read that must run to completion. Sources never see it cancelled.
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    /// A read the caller may abandon by cancelling `token`.
    pub fn cancellable(token: CancellationToken) -> Self {
        Self {
            cancel: Some(token),
        }
    }

    /// True if this read can never be cancelled.
    pub fn is_detached(&self) -> bool {
        self.cancel.is_none()
    }

    /// True if the caller has already cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|t| t.is_cancelled())
    }

    /// Resolves when the caller cancels; never resolves for detached reads.
    pub async fn cancelled(&self) {
        match &self.cancel {
            Some(token) => token.cancelled().await,
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn default_is_detached() {
        let cx = ReadContext::default();
        assert!(cx.is_detached());
        assert!(!cx.is_cancelled());
    }

    #[test]
    fn cancellable_tracks_token() {
        let token = CancellationToken::new();
        let cx = ReadContext::cancellable(token.clone());
        assert!(!cx.is_detached());
        assert!(!cx.is_cancelled());
        token.cancel();
        assert!(cx.is_cancelled());
    }

    #[tokio::test]
    async fn detached_never_resolves() {
        let cx = ReadContext::detached();
        let res = tokio::time::timeout(Duration::from_millis(20), cx.cancelled()).await;
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn cancelled_resolves_after_cancel() {
        let token = CancellationToken::new();
        let cx = ReadContext::cancellable(token.clone());
        token.cancel();
        tokio::time::timeout(Duration::from_millis(100), cx.cancelled())
            .await
            .expect("cancelled() should resolve");
    }
}
