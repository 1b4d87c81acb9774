//! A single instruction attachment and its reference tree.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use attachkit_core::{ReferenceNode, ReferenceResolver, ResolverEvent, Uri};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::status::{aggregate_status, ReferenceStatus};

/// Receives lifecycle notifications from instruction attachments.
///
/// Passed to [`InstructionAttachment::with_observer`] and held weakly, so an
/// observer that owns its attachments does not keep itself alive.
pub trait AttachmentObserver: Send + Sync {
    /// The tree or the enabled flag changed.
    fn changed(&self, uri: &Uri);

    /// The attachment was disposed; it will never change again.
    fn disposed(&self, uri: &Uri);
}

struct AttachmentState {
    reference: ReferenceNode,
    enabled: bool,
    disposed: bool,
    resolution: Option<JoinHandle<()>>,
}

struct AttachmentInner {
    uri: Uri,
    state: Mutex<AttachmentState>,
    observer: Option<Weak<dyn AttachmentObserver>>,
}

impl Drop for AttachmentInner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(task) = state.resolution.take() {
            task.abort();
        }
    }
}

/// An instruction file attached to a session.
///
/// Cloning is cheap and every clone refers to the same attachment.
#[derive(Clone)]
pub struct InstructionAttachment {
    inner: Arc<AttachmentInner>,
}

impl InstructionAttachment {
    /// A standalone attachment nobody observes.
    pub fn new(uri: Uri) -> Self {
        Self::build(uri, None)
    }

    pub fn with_observer(uri: Uri, observer: Weak<dyn AttachmentObserver>) -> Self {
        Self::build(uri, Some(observer))
    }

    fn build(uri: Uri, observer: Option<Weak<dyn AttachmentObserver>>) -> Self {
        Self {
            inner: Arc::new(AttachmentInner {
                state: Mutex::new(AttachmentState {
                    reference: ReferenceNode::new(uri.clone()),
                    enabled: true,
                    disposed: false,
                    resolution: None,
                }),
                uri,
                observer,
            }),
        }
    }

    pub fn uri(&self) -> &Uri {
        &self.inner.uri
    }

    /// Snapshot of the current reference tree.
    pub fn reference(&self) -> ReferenceNode {
        self.state().reference.clone()
    }

    /// Aggregated status of the current tree, computed fresh on each call.
    pub fn status(&self) -> Option<ReferenceStatus> {
        aggregate_status(&self.state().reference)
    }

    pub fn is_enabled(&self) -> bool {
        self.state().enabled
    }

    /// Toggle the attachment. Notifies the observer only on a real change.
    pub fn set_enabled(&self, enabled: bool) {
        {
            let mut state = self.state();
            if state.disposed || state.enabled == enabled {
                return;
            }
            state.enabled = enabled;
        }
        self.notify_changed();
    }

    pub fn is_disposed(&self) -> bool {
        self.state().disposed
    }

    /// Start resolving the reference tree in the background.
    ///
    /// Returns immediately. Must be called within a Tokio runtime. Updates
    /// arriving after [`dispose`](Self::dispose) are dropped.
    pub fn resolve(&self, resolver: &dyn ReferenceResolver) {
        if self.is_disposed() {
            return;
        }

        let mut updates = resolver.resolve(&self.inner.uri);
        let weak = Arc::downgrade(&self.inner);
        let task = tokio::spawn(async move {
            while let Some(event) = updates.recv().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let attachment = InstructionAttachment { inner };
                match event {
                    ResolverEvent::Updated(tree) => {
                        if !attachment.apply(tree) {
                            break;
                        }
                    }
                    ResolverEvent::Disposed => {
                        debug!(uri = %attachment.uri(), "Resolver reported unrecoverable reference");
                        attachment.dispose();
                        break;
                    }
                }
            }
        });

        let mut state = self.state();
        if state.disposed {
            task.abort();
        } else if let Some(previous) = state.resolution.replace(task) {
            previous.abort();
        }
    }

    /// Dispose the attachment: cancel resolution and notify the observer.
    /// Idempotent.
    pub fn dispose(&self) {
        {
            let mut state = self.state();
            if state.disposed {
                return;
            }
            state.disposed = true;
            if let Some(task) = state.resolution.take() {
                task.abort();
            }
        }

        debug!(uri = %self.inner.uri, "Instruction attachment disposed");
        if let Some(observer) = self.observer() {
            observer.disposed(&self.inner.uri);
        }
    }

    /// Install a new tree snapshot. Returns `false` once disposed.
    fn apply(&self, tree: ReferenceNode) -> bool {
        {
            let mut state = self.state();
            if state.disposed {
                return false;
            }
            state.reference = tree;
        }
        self.notify_changed();
        true
    }

    fn notify_changed(&self) {
        if let Some(observer) = self.observer() {
            observer.changed(&self.inner.uri);
        }
    }

    fn observer(&self) -> Option<Arc<dyn AttachmentObserver>> {
        self.inner.observer.as_ref().and_then(Weak::upgrade)
    }

    fn state(&self) -> MutexGuard<'_, AttachmentState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for InstructionAttachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("InstructionAttachment")
            .field("uri", &self.inner.uri)
            .field("enabled", &state.enabled)
            .field("disposed", &state.disposed)
            .finish()
    }
}
