//! File admission control.
//!
//! Files are a bounded resource: at most `file_limit` of them may be active
//! at once. Files that arrive when every slot is taken wait in an exclusion
//! queue and are re-admitted oldest first whenever capacity frees up.
//! Non-file attachments bypass the limit; one that reuses the id of a queued
//! file replaces it.
//!
//! At every return to the caller:
//! - no id is both active and queued
//! - admission never pushes the active file count past the limit
//!   in effect at the time of the decision
//!
//! Lowering the limit evicts nothing. The active count stays above it, and
//! nothing is re-admitted, until deletions bring it back under.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use attachkit_core::{AttachmentEntry, EventBus, FileLimitSource};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::store::{ensure_id, AttachmentEvent, AttachmentStore};

/// An [`AttachmentStore`] that enforces the file attachment limit.
pub struct AdmissionController {
    store: AttachmentStore,
    excluded: VecDeque<AttachmentEntry>,
    limit: Arc<dyn FileLimitSource>,
}

impl AdmissionController {
    /// The limit is asked again for every decision, so a host may change it
    /// between calls.
    pub fn new(limit: impl FileLimitSource + 'static) -> Self {
        Self::with_limit(Arc::new(limit))
    }

    pub fn with_limit(limit: Arc<dyn FileLimitSource>) -> Self {
        Self {
            store: AttachmentStore::with_events(EventBus::default()),
            excluded: VecDeque::new(),
            limit,
        }
    }

    /// Add attachments, admitting files only while slots are free.
    ///
    /// Files are considered in input order; duplicates of active files or of
    /// earlier entries in the same call are dropped. Files that do not fit
    /// are appended to the exclusion queue and a
    /// [`AttachmentEvent::LimitExceeded`] is published.
    pub fn add_context(&mut self, entries: impl IntoIterator<Item = AttachmentEntry>) {
        let mut files = Vec::new();
        let mut others = Vec::new();
        let mut seen = HashSet::new();

        for mut entry in entries {
            ensure_id(&mut entry);
            if !entry.is_file {
                others.push(entry);
            } else if !self.store.contains(&entry.id) && seen.insert(entry.id.clone()) {
                files.push(entry);
            }
        }

        let available = self.available_slots();
        let overflow = files.split_off(available.min(files.len()));

        // An id that becomes active must not linger in the queue, whether it
        // arrives as a file or not.
        let admitted_ids: HashSet<&str> = files
            .iter()
            .chain(others.iter().filter(|e| !self.store.contains(&e.id)))
            .map(|e| e.id.as_str())
            .collect();
        let queued_before = self.excluded.len();
        self.excluded.retain(|e| !admitted_ids.contains(e.id.as_str()));
        let dequeued = queued_before - self.excluded.len();

        let mut newly_excluded = Vec::new();
        for entry in overflow {
            if self.is_excluded(&entry.id) {
                continue;
            }
            newly_excluded.push(entry.id.clone());
            self.excluded.push_back(entry);
        }

        let admitted = files.len();
        let inserted = self.store.insert_entries(files.into_iter().chain(others));
        debug!(
            admitted,
            excluded = newly_excluded.len(),
            available,
            "File admission decided"
        );

        if inserted + dequeued + newly_excluded.len() > 0 {
            self.store.events().publish(AttachmentEvent::Changed);
        }
        if !newly_excluded.is_empty() {
            info!(
                count = newly_excluded.len(),
                limit = self.limit.file_limit(),
                "File attachment limit exceeded"
            );
            self.store.events().publish(AttachmentEvent::LimitExceeded {
                excluded_ids: newly_excluded,
            });
        }
    }

    /// Delete attachments, whether active or queued, then refill free slots
    /// from the front of the exclusion queue.
    pub fn delete<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ids: Vec<String> = ids.into_iter().map(|id| id.as_ref().to_string()).collect();

        let queued_before = self.excluded.len();
        self.excluded.retain(|e| !ids.contains(&e.id));
        let dequeued = queued_before - self.excluded.len();

        let removed = self.store.remove_ids(&ids);
        let readmitted = self.readmit();

        if removed + dequeued + readmitted > 0 {
            self.store.events().publish(AttachmentEvent::Changed);
        }
    }

    /// Re-admit queued files into any free slots. Returns how many were
    /// admitted.
    ///
    /// `delete` does this automatically; call it after raising the limit.
    pub fn rebalance(&mut self) -> usize {
        let readmitted = self.readmit();
        if readmitted > 0 {
            self.store.events().publish(AttachmentEvent::Changed);
        }
        readmitted
    }

    /// Empty both the active store and the exclusion queue.
    pub fn clear(&mut self) {
        let dequeued = self.excluded.len();
        self.excluded.clear();
        let cleared = self.store.clear_entries();
        if cleared + dequeued > 0 {
            self.store.events().publish(AttachmentEvent::Changed);
        }
    }

    // ── Queries ──

    /// Active attachments.
    pub fn entries(&self) -> &[AttachmentEntry] {
        self.store.entries()
    }

    /// Queued files, oldest first.
    pub fn excluded(&self) -> impl Iterator<Item = &AttachmentEntry> {
        self.excluded.iter()
    }

    pub fn excluded_ids(&self) -> Vec<&str> {
        self.excluded.iter().map(|e| e.id.as_str()).collect()
    }

    pub fn is_excluded(&self, id: &str) -> bool {
        self.excluded.iter().any(|e| e.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.store.ids()
    }

    pub fn get(&self, id: &str) -> Option<&AttachmentEntry> {
        self.store.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.store.contains(id)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn active_file_count(&self) -> usize {
        self.store.file_count()
    }

    pub fn file_limit(&self) -> usize {
        self.limit.file_limit()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<AttachmentEvent>> {
        self.store.subscribe()
    }

    fn available_slots(&self) -> usize {
        self.limit
            .file_limit()
            .saturating_sub(self.store.file_count())
    }

    /// Move queued files into free slots, oldest first. Returns how many
    /// were admitted.
    fn readmit(&mut self) -> usize {
        let mut readmitted = 0;
        while self.available_slots() > 0 {
            let Some(entry) = self.excluded.pop_front() else {
                break;
            };
            // Does not take a slot; keep filling from the queue.
            if self.store.contains(&entry.id) {
                debug!(id = %entry.id, "Queued file already active, dropped from queue");
                continue;
            }
            readmitted += self.store.insert_entries([entry]);
        }
        if readmitted > 0 {
            debug!(readmitted, queued = self.excluded.len(), "Re-admitted excluded files");
        }
        readmitted
    }
}

impl std::fmt::Debug for AdmissionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionController")
            .field("store", &self.store)
            .field("excluded", &self.excluded)
            .field("file_limit", &self.limit.file_limit())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attachkit_core::{SharedFileLimit, Uri};

    fn file(name: &str) -> AttachmentEntry {
        AttachmentEntry::file(Uri::file(format!("/work/{name}")))
    }

    fn id(name: &str) -> String {
        format!("file:///work/{name}")
    }

    fn active(ctrl: &AdmissionController) -> Vec<String> {
        ctrl.ids().map(String::from).collect()
    }

    fn queued(ctrl: &AdmissionController) -> Vec<String> {
        ctrl.excluded_ids().into_iter().map(String::from).collect()
    }

    fn events(rx: &mut broadcast::Receiver<Arc<AttachmentEvent>>) -> Vec<AttachmentEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event.as_ref().clone());
        }
        out
    }

    fn assert_invariants(ctrl: &AdmissionController) {
        assert!(ctrl.active_file_count() <= ctrl.file_limit());
        for queued in ctrl.excluded() {
            assert!(!ctrl.contains(&queued.id), "{} is both active and queued", queued.id);
        }
    }

    #[test]
    fn over_limit_files_are_queued_and_readmitted_on_delete() {
        let mut ctrl = AdmissionController::new(2usize);
        let mut rx = ctrl.subscribe();

        ctrl.add_context([file("a"), file("b"), file("c")]);
        assert_eq!(active(&ctrl), vec![id("a"), id("b")]);
        assert_eq!(queued(&ctrl), vec![id("c")]);
        assert_eq!(
            events(&mut rx),
            vec![
                AttachmentEvent::Changed,
                AttachmentEvent::LimitExceeded {
                    excluded_ids: vec![id("c")]
                },
            ]
        );
        assert_invariants(&ctrl);

        ctrl.delete([id("a")]);
        assert_eq!(active(&ctrl), vec![id("b"), id("c")]);
        assert!(queued(&ctrl).is_empty());
        assert_eq!(events(&mut rx), vec![AttachmentEvent::Changed]);
        assert_invariants(&ctrl);
    }

    #[test]
    fn readmission_is_fifo() {
        let mut ctrl = AdmissionController::new(1usize);
        ctrl.add_context([file("x")]);
        ctrl.add_context([file("a"), file("b")]);
        ctrl.add_context([file("c")]);
        assert_eq!(queued(&ctrl), vec![id("a"), id("b"), id("c")]);

        ctrl.delete([id("x")]);
        assert_eq!(active(&ctrl), vec![id("a")]);
        assert_eq!(queued(&ctrl), vec![id("b"), id("c")]);

        ctrl.delete([id("a")]);
        assert_eq!(active(&ctrl), vec![id("b")]);
        assert_invariants(&ctrl);
    }

    #[test]
    fn duplicates_in_one_call_and_across_calls_are_dropped() {
        let mut ctrl = AdmissionController::new(5usize);
        ctrl.add_context([file("a"), file("a")]);
        ctrl.add_context([file("a")]);
        assert_eq!(active(&ctrl), vec![id("a")]);
    }

    #[test]
    fn already_queued_file_is_not_queued_twice() {
        let mut ctrl = AdmissionController::new(1usize);
        ctrl.add_context([file("a"), file("b")]);
        let mut rx = ctrl.subscribe();

        ctrl.add_context([file("b")]);
        assert_eq!(queued(&ctrl), vec![id("b")]);
        assert!(events(&mut rx).is_empty());
    }

    #[test]
    fn non_files_bypass_the_limit() {
        let mut ctrl = AdmissionController::new(0usize);
        let mut rx = ctrl.subscribe();
        ctrl.add_context([
            file("a"),
            AttachmentEntry::variable("v1", "selection", serde_json::json!("x")),
        ]);

        assert_eq!(active(&ctrl), vec!["v1".to_string()]);
        assert_eq!(queued(&ctrl), vec![id("a")]);
        assert_eq!(ctrl.active_file_count(), 0);
        let received = events(&mut rx);
        assert_eq!(received.len(), 2);
        assert!(matches!(received[1], AttachmentEvent::LimitExceeded { .. }));
    }

    #[test]
    fn queued_file_can_be_deleted_without_admission() {
        let mut ctrl = AdmissionController::new(1usize);
        ctrl.add_context([file("a"), file("b"), file("c")]);
        let mut rx = ctrl.subscribe();

        ctrl.delete([id("b")]);
        assert_eq!(active(&ctrl), vec![id("a")]);
        assert_eq!(queued(&ctrl), vec![id("c")]);
        assert_eq!(events(&mut rx), vec![AttachmentEvent::Changed]);
    }

    #[test]
    fn delete_of_unknown_id_is_silent() {
        let mut ctrl = AdmissionController::new(1usize);
        ctrl.add_context([file("a")]);
        let mut rx = ctrl.subscribe();

        ctrl.delete(["file:///nope"]);
        assert!(events(&mut rx).is_empty());
    }

    #[test]
    fn raised_limit_is_honoured_on_next_call() {
        let limit = SharedFileLimit::new(1);
        let mut ctrl = AdmissionController::new(limit.clone());
        ctrl.add_context([file("a"), file("b"), file("c")]);
        assert_eq!(queued(&ctrl), vec![id("b"), id("c")]);

        limit.set(3);
        assert_eq!(ctrl.rebalance(), 2);
        assert_eq!(active(&ctrl), vec![id("a"), id("b"), id("c")]);
        assert_invariants(&ctrl);
    }

    #[test]
    fn readmission_is_capacity_based_even_when_deleting_a_queued_file() {
        let limit = SharedFileLimit::new(1);
        let mut ctrl = AdmissionController::new(limit.clone());
        ctrl.add_context([file("a"), file("b"), file("c")]);

        limit.set(2);
        ctrl.delete([id("c")]);
        assert_eq!(active(&ctrl), vec![id("a"), id("b")]);
        assert!(queued(&ctrl).is_empty());
    }

    #[test]
    fn readding_a_queued_file_with_room_moves_it_out_of_the_queue() {
        let limit = SharedFileLimit::new(1);
        let mut ctrl = AdmissionController::new(limit.clone());
        ctrl.add_context([file("a"), file("b")]);

        limit.set(2);
        ctrl.add_context([file("b")]);
        assert_eq!(active(&ctrl), vec![id("a"), id("b")]);
        assert!(queued(&ctrl).is_empty());
        assert_invariants(&ctrl);
    }

    #[test]
    fn clear_empties_both_sets() {
        let mut ctrl = AdmissionController::new(1usize);
        ctrl.add_context([file("a"), file("b")]);
        ctrl.clear();
        assert!(ctrl.is_empty());
        assert!(queued(&ctrl).is_empty());
    }

    #[test]
    fn non_file_with_a_queued_id_takes_over_that_id() {
        let mut ctrl = AdmissionController::new(1usize);
        ctrl.add_context([file("a"), file("b")]);
        let mut rx = ctrl.subscribe();

        ctrl.add_context([AttachmentEntry::variable(
            id("b"),
            "b",
            serde_json::json!({"text": "pinned"}),
        )]);
        assert_eq!(active(&ctrl), vec![id("a"), id("b")]);
        assert!(queued(&ctrl).is_empty());
        assert_eq!(events(&mut rx), vec![AttachmentEvent::Changed]);
        assert_invariants(&ctrl);

        ctrl.delete([id("a")]);
        assert_eq!(active(&ctrl), vec![id("b")]);
        assert!(!ctrl.get(&id("b")).unwrap().is_file);
        assert_eq!(ctrl.active_file_count(), 0);
        assert_invariants(&ctrl);
    }

    #[test]
    fn readmission_skips_queued_ids_that_are_already_active() {
        let mut ctrl = AdmissionController::new(2usize);
        ctrl.add_context([file("a")]);
        ctrl.excluded.push_back(file("a"));
        ctrl.excluded.push_back(file("b"));

        assert_eq!(ctrl.rebalance(), 1);
        assert_eq!(active(&ctrl), vec![id("a"), id("b")]);
        assert!(queued(&ctrl).is_empty());
        assert_invariants(&ctrl);
    }

    #[test]
    fn lowered_limit_converges_as_files_are_deleted() {
        let limit = SharedFileLimit::new(3);
        let mut ctrl = AdmissionController::new(limit.clone());
        ctrl.add_context([file("a"), file("b"), file("c"), file("d")]);
        assert_eq!(queued(&ctrl), vec![id("d")]);

        limit.set(1);
        // Active files are never evicted.
        assert_eq!(ctrl.active_file_count(), 3);
        assert_eq!(ctrl.file_limit(), 1);

        ctrl.add_context([file("e")]);
        assert_eq!(queued(&ctrl), vec![id("d"), id("e")]);
        assert_eq!(ctrl.rebalance(), 0);

        ctrl.delete([id("a")]);
        assert_eq!(ctrl.active_file_count(), 2);
        assert_eq!(queued(&ctrl), vec![id("d"), id("e")]);

        ctrl.delete([id("b")]);
        assert_eq!(ctrl.active_file_count(), 1);
        assert_eq!(ctrl.rebalance(), 0);
        assert_eq!(queued(&ctrl), vec![id("d"), id("e")]);

        ctrl.delete([id("c")]);
        assert_eq!(active(&ctrl), vec![id("d")]);
        assert_eq!(queued(&ctrl), vec![id("e")]);
        assert_invariants(&ctrl);
    }

    #[test]
    fn invariants_hold_across_a_random_walk() {
        let mut ctrl = AdmissionController::new(3usize);
        let names = ["a", "b", "c", "d", "e", "f"];
        for step in 0..60usize {
            let name = names[(step * 7 + 3) % names.len()];
            if step % 3 == 2 {
                ctrl.delete([id(name)]);
            } else {
                ctrl.add_context([file(name), file(names[step % names.len()])]);
            }
            assert_invariants(&ctrl);
        }
    }
}
