//! CancelToken - hierarchical cancellation scope
//!
//! Each token owns a `watch` channel flag and an optional parent. A token
//! counts as cancelled when it or any ancestor has been cancelled.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::select_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Cancellation scope shared by a broadcast and every task it spawns
///
/// Cloning is cheap and yields a handle to the same scope.
///
/// # Examples
/// ```
/// use contracts::CancelToken;
///
/// let parent = CancelToken::new();
/// let child = parent.child();
/// child.cancel();
/// assert!(child.is_cancelled());
/// assert!(!parent.is_cancelled());
///
/// parent.cancel();
/// assert!(parent.child().is_cancelled());
/// ```
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

struct Inner {
    flag: watch::Sender<bool>,
    parent: Option<CancelToken>,
}

impl CancelToken {
    /// Create a root scope
    pub fn new() -> Self {
        Self::with_parent(None)
    }

    fn with_parent(parent: Option<CancelToken>) -> Self {
        let (flag, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner { flag, parent }),
        }
    }

    /// Derive a child scope, cancelled together with `self`
    pub fn child(&self) -> Self {
        Self::with_parent(Some(self.clone()))
    }

    /// Cancel this scope and all of its children
    pub fn cancel(&self) {
        self.inner.flag.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.lineage().any(|token| *token.inner.flag.borrow())
    }

    /// Resolve once this scope or any ancestor is cancelled
    pub async fn cancelled(&self) {
        let mut flags: Vec<_> = self
            .lineage()
            .map(|token| token.inner.flag.subscribe())
            .collect();

        // The senders live in `self`'s lineage, so `wait_for` cannot observe a closed channel.
        let waits = flags.iter_mut().map(|flag| {
            Box::pin(async move {
                let _ = flag.wait_for(|cancelled| *cancelled).await;
            })
        });
        select_all(waits).await;
    }

    /// Cancel this scope once `timeout` elapses
    ///
    /// The timer task exits early if the scope is cancelled first.
    /// Must be called from within a tokio runtime.
    pub fn cancel_after(&self, timeout: Duration) -> JoinHandle<()> {
        let token = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => token.cancel(),
                _ = token.cancelled() => {}
            }
        })
    }

    /// Cancel this scope when the returned guard is dropped
    pub fn drop_guard(&self) -> CancelGuard {
        CancelGuard {
            token: self.clone(),
        }
    }

    fn lineage(&self) -> impl Iterator<Item = &CancelToken> {
        std::iter::successors(Some(self), |token| token.inner.parent.as_ref())
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .field("depth", &self.lineage().count())
            .finish()
    }
}

/// Cancels its token on drop
#[must_use = "the scope is cancelled as soon as the guard is dropped"]
pub struct CancelGuard {
    token: CancelToken,
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
