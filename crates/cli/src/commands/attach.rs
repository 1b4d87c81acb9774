//! `attachkit attach` — Run files through file admission control.

use std::path::{Path, PathBuf};

use attachkit_attachments::{AdmissionController, AttachmentEvent};
use attachkit_config::AppConfig;
use attachkit_core::{AttachmentEntry, ResolveError, Uri};

pub async fn run(
    files: Vec<PathBuf>,
    limit: Option<usize>,
    remove: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let limit = limit.unwrap_or(config.attachments.max_files);

    let mut controller = AdmissionController::new(limit);
    let mut events = controller.subscribe();

    controller.add_context(
        files
            .iter()
            .map(|f| AttachmentEntry::file(super::file_uri(f))),
    );

    if !remove.is_empty() {
        let ids = remove
            .iter()
            .map(|raw| attachment_id(raw))
            .collect::<Result<Vec<_>, _>>()?;
        controller.delete(&ids);
    }

    while let Ok(event) = events.try_recv() {
        if let AttachmentEvent::LimitExceeded { excluded_ids } = event.as_ref() {
            println!(
                "⚠️  File limit of {limit} reached, {} file(s) queued",
                excluded_ids.len()
            );
        }
    }

    println!("Attached ({}/{limit})", controller.active_file_count());
    println!("==================");
    for entry in controller.entries() {
        println!("  {}", entry.name);
    }

    let excluded: Vec<&AttachmentEntry> = controller.excluded().collect();
    if !excluded.is_empty() {
        println!("\nQueued ({})", excluded.len());
        println!("==================");
        for entry in excluded {
            println!("  {}", entry.name);
        }
    }

    Ok(())
}

/// A `--remove` value is either an attachment id (`scheme://...`) or a path.
fn attachment_id(raw: &str) -> Result<String, ResolveError> {
    if raw.contains("://") {
        Ok(Uri::parse(raw)?.to_string())
    } else {
        Ok(super::file_uri(Path::new(raw)).to_string())
    }
}
