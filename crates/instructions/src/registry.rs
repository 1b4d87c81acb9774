//! Instruction attachment registry — owns the instruction attachments of a
//! session, keyed by normalized path.
//!
//! The registry observes every attachment it creates: tree updates and toggles
//! are re-published as [`RegistryEvent::Changed`], and an attachment that
//! disposes itself is evicted automatically.

use std::sync::{Arc, Mutex, MutexGuard};

use attachkit_core::{EventBus, ReferenceResolver, Uri};
use tokio::sync::broadcast;
use tracing::debug;

use crate::attachment::{AttachmentObserver, InstructionAttachment};

/// Notifications published by the registry.
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    /// A new attachment was created. Always followed by `Changed`.
    Added(InstructionAttachment),

    /// The set of attachments, or anything inside one of them, changed.
    Changed,
}

struct RegistryShared {
    attachments: Mutex<Vec<InstructionAttachment>>,
    events: EventBus<RegistryEvent>,
}

impl RegistryShared {
    fn attachments(&self) -> MutexGuard<'_, Vec<InstructionAttachment>> {
        self.attachments.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn evict(&self, key: &str) -> Option<InstructionAttachment> {
        let mut attachments = self.attachments();
        let index = attachments.iter().position(|a| a.uri().key() == key)?;
        Some(attachments.remove(index))
    }

    fn holds(&self, key: &str) -> bool {
        self.attachments().iter().any(|a| a.uri().key() == key)
    }
}

impl AttachmentObserver for RegistryShared {
    fn changed(&self, uri: &Uri) {
        if self.holds(uri.key()) {
            self.events.publish(RegistryEvent::Changed);
        }
    }

    fn disposed(&self, uri: &Uri) {
        if self.evict(uri.key()).is_some() {
            debug!(uri = %uri, "Evicted disposed instruction attachment");
            self.events.publish(RegistryEvent::Changed);
        }
    }
}

/// The instruction attachments of one session.
pub struct InstructionAttachmentRegistry {
    shared: Arc<RegistryShared>,
    resolver: Arc<dyn ReferenceResolver>,
}

impl InstructionAttachmentRegistry {
    pub fn new(resolver: Arc<dyn ReferenceResolver>) -> Self {
        Self {
            shared: Arc::new(RegistryShared {
                attachments: Mutex::new(Vec::new()),
                events: EventBus::default(),
            }),
            resolver,
        }
    }

    /// Attach an instruction file and start resolving it.
    ///
    /// Returns the new attachment, or `None` if the path is already attached.
    /// Must be called within a Tokio runtime.
    pub fn add(&self, uri: Uri) -> Option<InstructionAttachment> {
        let observer: Arc<dyn AttachmentObserver> = self.shared.clone();
        let attachment = InstructionAttachment::with_observer(uri, Arc::downgrade(&observer));

        {
            let mut attachments = self.shared.attachments();
            if attachments.iter().any(|a| a.uri().key() == attachment.uri().key()) {
                return None;
            }
            attachments.push(attachment.clone());
        }

        debug!(uri = %attachment.uri(), "Instruction attachment added");
        self.shared
            .events
            .publish(RegistryEvent::Added(attachment.clone()));
        self.shared.events.publish(RegistryEvent::Changed);

        attachment.resolve(self.resolver.as_ref());
        Some(attachment)
    }

    /// Detach and dispose. Returns `false` if the path was not attached.
    pub fn remove(&self, uri: &Uri) -> bool {
        let Some(attachment) = self.shared.evict(uri.key()) else {
            return false;
        };
        attachment.dispose();
        debug!(uri = %uri, "Instruction attachment removed");
        self.shared.events.publish(RegistryEvent::Changed);
        true
    }

    /// Dispose every attachment. Publishes one event if anything was held.
    pub fn clear(&self) {
        let removed = std::mem::take(&mut *self.shared.attachments());
        if removed.is_empty() {
            return;
        }
        for attachment in &removed {
            attachment.dispose();
        }
        self.shared.events.publish(RegistryEvent::Changed);
    }

    pub fn get(&self, uri: &Uri) -> Option<InstructionAttachment> {
        self.shared
            .attachments()
            .iter()
            .find(|a| a.uri().key() == uri.key())
            .cloned()
    }

    pub fn contains(&self, uri: &Uri) -> bool {
        self.shared.holds(uri.key())
    }

    /// All attachments in the order they were added.
    pub fn attachments(&self) -> Vec<InstructionAttachment> {
        self.shared.attachments().clone()
    }

    pub fn enabled_attachments(&self) -> Vec<InstructionAttachment> {
        self.shared
            .attachments()
            .iter()
            .filter(|a| a.is_enabled())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.shared.attachments().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.attachments().is_empty()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<RegistryEvent>> {
        self.shared.events.subscribe()
    }
}
