//! Cooperative shutdown of the capture pipeline

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::source::FrameSource;

struct Inner {
    token: CancellationToken,
    finished: AtomicBool,
    source: Arc<dyn FrameSource>,
}

/// Write-once "finished" flag shared by the capture and decode contexts.
///
/// The first [`finish`](Self::finish) sets the flag, cancels every loop waiting on
/// the token and shuts the camera down. Later calls are no-ops, so the flag never
/// goes back to false and the camera is shut down exactly once.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    inner: Arc<Inner>,
}

impl ShutdownCoordinator {
    pub fn new(source: Arc<dyn FrameSource>) -> Self {
        Self {
            inner: Arc::new(Inner {
                token: CancellationToken::new(),
                finished: AtomicBool::new(false),
                source,
            }),
        }
    }

    /// Set the finished flag. Returns `true` only for the call that set it.
    pub fn finish(&self) -> bool {
        if self.inner.finished.swap(true, Ordering::AcqRel) {
            return false;
        }

        info!("Pipeline finished, stopping capture");
        self.inner.token.cancel();
        self.inner.source.shutdown();
        true
    }

    pub fn is_finished(&self) -> bool {
        self.inner.finished.load(Ordering::Acquire)
    }

    /// Token cancelled by [`finish`](Self::finish), for `select!` in the loops
    pub fn token(&self) -> CancellationToken {
        self.inner.token.clone()
    }

    /// Resolves once the pipeline has finished
    pub async fn cancelled(&self) {
        self.inner.token.cancelled().await
    }
}

impl std::fmt::Debug for ShutdownCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownCoordinator").field("finished", &self.is_finished()).finish()
    }
}
