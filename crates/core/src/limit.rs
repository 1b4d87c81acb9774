//! The file attachment limit, as seen by admission control.
//!
//! The limit is a session setting that can change at any time, so admission
//! asks for it on every decision instead of caching it.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Answers the current maximum number of concurrently attached files.
pub trait FileLimitSource: Send + Sync {
    fn file_limit(&self) -> usize;
}

impl FileLimitSource for usize {
    fn file_limit(&self) -> usize {
        *self
    }
}

impl<F> FileLimitSource for F
where
    F: Fn() -> usize + Send + Sync,
{
    fn file_limit(&self) -> usize {
        self()
    }
}

/// A limit the host can change at runtime; clones share the same value.
#[derive(Debug, Clone, Default)]
pub struct SharedFileLimit(Arc<AtomicUsize>);

impl SharedFileLimit {
    pub fn new(limit: usize) -> Self {
        Self(Arc::new(AtomicUsize::new(limit)))
    }

    pub fn set(&self, limit: usize) {
        self.0.store(limit, Ordering::SeqCst);
    }
}

impl FileLimitSource for SharedFileLimit {
    fn file_limit(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}
