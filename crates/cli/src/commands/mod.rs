pub mod attach;
pub mod discover;
pub mod doctor;
pub mod inspect;
pub mod status;

use std::path::{Path, PathBuf};

use attachkit_core::Uri;

/// Absolute file URI for a path given on the command line.
pub(crate) fn file_uri(path: &Path) -> Uri {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    Uri::file(absolute)
}

/// Workspace roots, defaulting to the current directory.
pub(crate) fn roots_or_cwd(roots: Vec<PathBuf>) -> Vec<PathBuf> {
    if roots.is_empty() {
        vec![std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))]
    } else {
        roots
    }
}
