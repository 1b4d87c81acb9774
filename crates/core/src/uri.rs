//! Resource identifiers and text ranges.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::ResolveError;

/// A resource identifier: a scheme plus a `/`-separated path.
///
/// Only the pieces the attachment model needs are kept. Paths are stored with
/// forward slashes regardless of platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Uri {
    scheme: String,
    path: String,
}

impl Uri {
    /// A `file` URI for a filesystem path.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            scheme: "file".into(),
            path: path.as_ref().to_string_lossy().replace('\\', "/"),
        }
    }

    /// Parse `scheme://path`. A string without a scheme is a file path.
    pub fn parse(raw: &str) -> Result<Self, ResolveError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ResolveError::InvalidUri("empty URI".into()));
        }

        match raw.split_once("://") {
            Some((scheme, path)) => {
                let valid_scheme = !scheme.is_empty()
                    && scheme
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
                if !valid_scheme || path.is_empty() {
                    return Err(ResolveError::InvalidUri(raw.into()));
                }
                Ok(Self {
                    scheme: scheme.to_ascii_lowercase(),
                    path: path.to_string(),
                })
            }
            None => Ok(Self::file(raw)),
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Normalized path used as a collection key (trailing `/` trimmed).
    pub fn key(&self) -> &str {
        let trimmed = self.path.trim_end_matches('/');
        if trimmed.is_empty() { "/" } else { trimmed }
    }

    /// Last path segment.
    pub fn base_name(&self) -> &str {
        self.key().rsplit('/').next().unwrap_or_default()
    }

    /// The containing directory, if any.
    pub fn parent(&self) -> Option<Uri> {
        let key = self.key();
        let idx = key.rfind('/')?;
        let parent = if idx == 0 { "/" } else { &key[..idx] };
        Some(Self {
            scheme: self.scheme.clone(),
            path: parent.to_string(),
        })
    }

    /// Resolve a relative (or absolute) path against this URI's directory.
    pub fn resolve_relative(&self, reference: &str) -> Uri {
        let reference = reference.replace('\\', "/");
        let base = if reference.starts_with('/') {
            String::new()
        } else {
            self.parent().map(|p| p.path).unwrap_or_default()
        };

        let mut segments: Vec<&str> = Vec::new();
        for segment in base.split('/').chain(reference.split('/')) {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                other => segments.push(other),
            }
        }

        Self {
            scheme: self.scheme.clone(),
            path: format!("/{}", segments.join("/")),
        }
    }

    /// Filesystem path for `file` URIs.
    pub fn to_file_path(&self) -> Option<PathBuf> {
        (self.scheme == "file").then(|| PathBuf::from(&self.path))
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.path)
    }
}

/// A text range inside a resource (1-based lines and columns).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl Range {
    pub fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    /// Lines spanned, e.g. `12-40` or `7`.
    pub fn line_label(&self) -> String {
        if self.start_line == self.end_line {
            self.start_line.to_string()
        } else {
            format!("{}-{}", self.start_line, self.end_line)
        }
    }
}
