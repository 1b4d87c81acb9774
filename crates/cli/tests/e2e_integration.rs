//! End-to-end integration tests for attachkit.
//!
//! These tests exercise the full pipeline: instruction discovery, the
//! registry with the filesystem resolver, status aggregation, and file
//! admission control.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use attachkit_attachments::{AdmissionController, AttachmentEvent};
use attachkit_config::AppConfig;
use attachkit_core::{AttachmentEntry, SharedFileLimit, Uri};
use attachkit_instructions::{
    FsInstructionSource, FsReferenceResolver, InstructionAttachmentRegistry, InstructionFileSource,
    RegistryEvent, StatusKind,
};

// ── Helpers ──────────────────────────────────────────────────────────────

fn write(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// Poll until `check` holds, failing after a few seconds.
async fn eventually(what: &str, check: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !check() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for: {what}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn workspace() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let prompts = dir.path().join(".github/prompts");

    write(&prompts.join("clean.prompt.md"), "Follow #file:./shared/style.prompt.md");
    write(&prompts.join("shared/style.prompt.md"), "Use [notes](./notes.txt)");
    write(&prompts.join("shared/notes.txt"), "plain text");
    write(&prompts.join("nested.prompt.md"), "See #file:./missing.prompt.md and #file:./gone.prompt.md");
    write(&prompts.join("loop.prompt.md"), "#file:./other.instructions.md");
    write(&prompts.join("other.instructions.md"), "[back](./loop.prompt.md)");
    write(&prompts.join("README.md"), "not an instruction file");
    dir
}

// ── E2E: Discovery → Registry → Status ───────────────────────────────────

#[tokio::test]
async fn e2e_discovered_instructions_report_status() {
    let ws = workspace();
    let config = AppConfig::default();

    let source = FsInstructionSource::new(config.instructions.extension.clone());
    let files = source
        .list(&[ws.path().to_path_buf()], &config.instructions.locations())
        .await
        .unwrap();
    let names: Vec<&str> = files.iter().map(|u| u.base_name()).collect();
    assert_eq!(names, vec!["clean.prompt.md", "loop.prompt.md", "nested.prompt.md"]);

    let registry = InstructionAttachmentRegistry::new(Arc::new(FsReferenceResolver::new()));
    let mut events = registry.subscribe();
    for uri in &files {
        registry.add(uri.clone()).unwrap();
    }

    let added = std::iter::from_fn(|| events.try_recv().ok())
        .filter(|e| matches!(e.as_ref(), RegistryEvent::Added(_)))
        .count();
    assert_eq!(added, 3);

    let nested = registry.get(&files[2]).unwrap();
    let looped = registry.get(&files[1]).unwrap();
    let clean = registry.get(&files[0]).unwrap();

    eventually("nested warning", || nested.status().is_some()).await;
    eventually("loop warning", || looped.status().is_some()).await;
    eventually("clean tree resolved", || !clean.reference().children.is_empty()).await;

    // Only a snippet file below the clean prompt: no status at all.
    assert_eq!(clean.status(), None);

    let status = nested.status().unwrap();
    assert_eq!(status.kind, StatusKind::Warning);
    assert!(status.details.contains("Contains a broken nested reference that will be ignored"));
    assert!(status.details.contains("missing.prompt.md"));
    assert!(status.details.ends_with("(+1 more error)"));

    let status = looped.status().unwrap();
    assert_eq!(status.kind, StatusKind::Warning);
    assert!(status.details.contains("loop.prompt.md -> other.instructions.md -> loop.prompt.md"));
}

#[tokio::test]
async fn e2e_missing_instruction_file_is_an_error_and_can_be_removed() {
    let ws = tempfile::tempdir().unwrap();
    let uri = Uri::file(ws.path().join("absent.prompt.md"));

    let registry = InstructionAttachmentRegistry::new(Arc::new(FsReferenceResolver::new()));
    let attachment = registry.add(uri.clone()).unwrap();
    assert!(registry.add(uri.clone()).is_none());

    eventually("open failure", || attachment.status().is_some()).await;
    let status = attachment.status().unwrap();
    assert_eq!(status.kind, StatusKind::Error);
    assert!(status.details.starts_with("Failed to open file"));

    assert!(registry.remove(&uri));
    assert!(attachment.is_disposed());
    assert!(registry.is_empty());
}

// ── E2E: Admission control ───────────────────────────────────────────────

#[test]
fn e2e_admission_scenario_limit_two() {
    let mut controller = AdmissionController::new(2usize);
    let mut events = controller.subscribe();

    let entry = |name: &str| AttachmentEntry::file(Uri::file(format!("/work/{name}")));
    controller.add_context([entry("a"), entry("b"), entry("c")]);

    let limit_events = std::iter::from_fn(|| events.try_recv().ok())
        .filter(|e| matches!(e.as_ref(), AttachmentEvent::LimitExceeded { .. }))
        .count();
    assert_eq!(limit_events, 1);
    assert_eq!(controller.ids().collect::<Vec<_>>(), vec!["file:///work/a", "file:///work/b"]);
    assert_eq!(controller.excluded_ids(), vec!["file:///work/c"]);

    controller.delete(["file:///work/a"]);
    assert_eq!(controller.ids().collect::<Vec<_>>(), vec!["file:///work/b", "file:///work/c"]);
    assert!(controller.excluded_ids().is_empty());
}

#[tokio::test]
async fn e2e_discovered_files_respect_a_runtime_limit() {
    let ws = workspace();
    let source = FsInstructionSource::default();
    let files = source
        .list(&[ws.path().to_path_buf()], &[".github/prompts".into()])
        .await
        .unwrap();

    let limit = SharedFileLimit::new(1);
    let mut controller = AdmissionController::new(limit.clone());
    controller.add_context(files.iter().cloned().map(AttachmentEntry::file));
    controller.add_context([AttachmentEntry::variable(
        "",
        "selection",
        serde_json::json!({"text": "fn main() {}"}),
    )]);

    assert_eq!(controller.active_file_count(), 1);
    assert_eq!(controller.excluded_ids().len(), 2);
    assert_eq!(controller.len(), 2);

    limit.set(10);
    assert_eq!(controller.rebalance(), 2);
    assert_eq!(controller.active_file_count(), 3);
    assert!(controller.excluded_ids().is_empty());
}

// ── E2E: Configuration ───────────────────────────────────────────────────

#[tokio::test]
async fn e2e_config_locations_drive_discovery() {
    let ws = workspace();
    write(&ws.path().join("team/prompts/team.prompt.md"), "team rules");

    let config_path = ws.path().join("config.toml");
    write(
        &config_path,
        "[attachments]\nmax_files = 4\n\n[instructions]\nlocations = [\"team/prompts\", 7]\n",
    );
    let config = AppConfig::load_from(&config_path).unwrap();
    assert_eq!(config.attachments.max_files, 4);

    let source = FsInstructionSource::new(config.instructions.extension.clone());
    let files = source
        .list(&[ws.path().to_path_buf()], &config.instructions.locations())
        .await
        .unwrap();
    let names: Vec<&str> = files.iter().map(|u| u.base_name()).collect();
    assert_eq!(names, vec!["team.prompt.md"]);
}
