//! Attachment store — the identity-keyed set of attachments in a session.
//!
//! Every public mutation publishes at most one [`AttachmentEvent::Changed`],
//! and only when the set actually changed. Events are published after the
//! mutation is applied.

use std::collections::HashSet;
use std::sync::Arc;

use attachkit_core::{AttachmentEntry, EventBus};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

/// Notifications published by attachment collections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentEvent {
    /// The active or excluded attachments changed.
    Changed,

    /// New file attachments were queued because the file limit was reached.
    LimitExceeded { excluded_ids: Vec<String> },
}

/// Identity-keyed attachment collection.
///
/// Iteration order is insertion order.
#[derive(Debug, Default)]
pub struct AttachmentStore {
    entries: Vec<AttachmentEntry>,
    ids: HashSet<String>,
    events: EventBus<AttachmentEvent>,
}

impl AttachmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store publishing on an existing bus.
    pub fn with_events(events: EventBus<AttachmentEvent>) -> Self {
        Self {
            entries: Vec::new(),
            ids: HashSet::new(),
            events,
        }
    }

    /// Insert entries whose id is not present yet. Returns how many were
    /// inserted.
    pub fn add(&mut self, entries: impl IntoIterator<Item = AttachmentEntry>) -> usize {
        let inserted = self.insert_entries(entries);
        if inserted > 0 {
            self.events.publish(AttachmentEvent::Changed);
        }
        inserted
    }

    /// Remove entries by id; absent ids are ignored. Returns how many were
    /// removed.
    pub fn remove<I, S>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let removed = self.remove_ids(ids);
        if removed > 0 {
            self.events.publish(AttachmentEvent::Changed);
        }
        removed
    }

    pub fn clear(&mut self) {
        if self.clear_entries() > 0 {
            self.events.publish(AttachmentEvent::Changed);
        }
    }

    /// Clear, then add. Publishes a single event.
    pub fn replace(&mut self, entries: impl IntoIterator<Item = AttachmentEntry>) {
        let cleared = self.clear_entries();
        let inserted = self.insert_entries(entries);
        if cleared + inserted > 0 {
            self.events.publish(AttachmentEvent::Changed);
        }
    }

    pub fn entries(&self) -> &[AttachmentEntry] {
        &self.entries
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.id.as_str())
    }

    pub fn get(&self, id: &str) -> Option<&AttachmentEntry> {
        if !self.ids.contains(id) {
            return None;
        }
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries that count against the file limit.
    pub fn file_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_file).count()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<AttachmentEvent>> {
        self.events.subscribe()
    }

    pub(crate) fn events(&self) -> &EventBus<AttachmentEvent> {
        &self.events
    }

    // ── Silent mutations, for composing collections ──

    pub(crate) fn insert_entries(&mut self, entries: impl IntoIterator<Item = AttachmentEntry>) -> usize {
        let mut inserted = 0;
        for mut entry in entries {
            ensure_id(&mut entry);
            if self.ids.insert(entry.id.clone()) {
                debug!(id = %entry.id, file = entry.is_file, "Attachment added");
                self.entries.push(entry);
                inserted += 1;
            }
        }
        inserted
    }

    pub(crate) fn remove_ids<I, S>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut removed = 0;
        for id in ids {
            let id = id.as_ref();
            if self.ids.remove(id) {
                self.entries.retain(|e| e.id != id);
                debug!(id = %id, "Attachment removed");
                removed += 1;
            }
        }
        removed
    }

    pub(crate) fn clear_entries(&mut self) -> usize {
        let cleared = self.entries.len();
        self.entries.clear();
        self.ids.clear();
        cleared
    }
}

/// Entries without an id get a generated one.
pub(crate) fn ensure_id(entry: &mut AttachmentEntry) {
    if entry.id.is_empty() {
        entry.id = Uuid::new_v4().to_string();
    }
}
