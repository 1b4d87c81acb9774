//! `attachkit inspect` — Resolve instruction files and report their status.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use attachkit_instructions::{
    FsReferenceResolver, InstructionAttachment, InstructionAttachmentRegistry, RegistryEvent,
    StatusKind,
};

/// Upper bound on how long to wait for resolution.
const RESOLVE_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn run(files: Vec<PathBuf>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let registry = InstructionAttachmentRegistry::new(Arc::new(FsReferenceResolver::new()));
    let mut events = registry.subscribe();

    let mut pending = 0usize;
    for file in &files {
        if registry.add(super::file_uri(file)).is_some() {
            pending += 1;
        }
    }

    // One `Changed` per add, plus one per resolved tree.
    let wait = async {
        let mut added = 0usize;
        let mut changed = 0usize;
        while changed < pending + added {
            match events.recv().await {
                Ok(event) => match event.as_ref() {
                    RegistryEvent::Added(_) => added += 1,
                    RegistryEvent::Changed => changed += 1,
                },
                Err(_) => break,
            }
        }
    };
    if tokio::time::timeout(RESOLVE_TIMEOUT, wait).await.is_err() {
        tracing::warn!("Timed out waiting for reference resolution");
    }

    let attachments = registry.attachments();
    if json {
        println!("{}", render_json(&attachments)?);
        return Ok(());
    }

    for attachment in &attachments {
        let reference = attachment.reference();
        let nested = reference.flatten().len() - 1;
        match attachment.status() {
            None => println!("✅ {} ({nested} nested references)", attachment.uri().path()),
            Some(status) => {
                let icon = match status.kind {
                    StatusKind::Error => "❌",
                    StatusKind::Warning => "⚠️ ",
                };
                println!("{icon} {} [{}]", attachment.uri().path(), status.kind);
                for line in status.details.lines() {
                    println!("     {line}");
                }
            }
        }
    }

    Ok(())
}

fn render_json(attachments: &[InstructionAttachment]) -> attachkit_core::Result<String> {
    let report: Vec<serde_json::Value> = attachments.iter().map(to_json).collect();
    Ok(serde_json::to_string_pretty(&report)?)
}

fn to_json(attachment: &InstructionAttachment) -> serde_json::Value {
    serde_json::json!({
        "uri": attachment.uri().to_string(),
        "enabled": attachment.is_enabled(),
        "status": attachment.status(),
        "reference": attachment.reference(),
    })
}
