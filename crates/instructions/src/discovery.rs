//! Instruction file discovery.
//!
//! Lists the instruction files a user can attach: every file directly inside
//! `root/location` (for each workspace root and configured location) whose
//! name ends with the instruction extension. Subdirectories are not walked.

use std::path::PathBuf;

use async_trait::async_trait;
use attachkit_core::{DiscoveryError, Uri};
use tracing::debug;

/// Enumerates candidate instruction files.
#[async_trait]
pub trait InstructionFileSource: Send + Sync {
    /// Files found under `root/location` for every root and location,
    /// sorted and without duplicates.
    async fn list(&self, roots: &[PathBuf], locations: &[String]) -> Result<Vec<Uri>, DiscoveryError>;
}

/// Discovery on the local filesystem.
pub struct FsInstructionSource {
    extension: String,
}

impl FsInstructionSource {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
        }
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    fn matches(&self, file_name: &str) -> bool {
        file_name.len() > self.extension.len() && file_name.ends_with(&self.extension)
    }
}

impl Default for FsInstructionSource {
    fn default() -> Self {
        Self::new(".prompt.md")
    }
}

#[async_trait]
impl InstructionFileSource for FsInstructionSource {
    async fn list(&self, roots: &[PathBuf], locations: &[String]) -> Result<Vec<Uri>, DiscoveryError> {
        let mut found = Vec::new();

        for root in roots {
            for location in locations {
                let dir = root.join(location);
                let mut entries = match tokio::fs::read_dir(&dir).await {
                    Ok(entries) => entries,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        debug!(dir = %dir.display(), "Instruction location does not exist");
                        continue;
                    }
                    Err(e) => {
                        return Err(DiscoveryError::ReadDir {
                            path: dir.display().to_string(),
                            reason: e.to_string(),
                        });
                    }
                };

                while let Some(entry) = entries.next_entry().await.map_err(|e| DiscoveryError::ReadDir {
                    path: dir.display().to_string(),
                    reason: e.to_string(),
                })? {
                    let file_name = entry.file_name();
                    if !self.matches(&file_name.to_string_lossy()) {
                        continue;
                    }
                    // Follows symlinks, unlike `entry.file_type()`.
                    match tokio::fs::metadata(entry.path()).await {
                        Ok(meta) if meta.is_file() => found.push(Uri::file(entry.path())),
                        _ => continue,
                    }
                }
            }
        }

        found.sort();
        found.dedup();
        debug!(count = found.len(), "Instruction files discovered");
        Ok(found)
    }
}
