//! Status aggregation over a reference tree.
//!
//! Collapses every error condition in a tree into the single status shown
//! next to an instruction attachment:
//!
//! | Situation | Result |
//! |-----------|--------|
//! | No user-visible condition | `None` |
//! | First condition is on the root | [`StatusKind::Error`] |
//! | First condition is on a descendant | [`StatusKind::Warning`], nested-reference prefix |
//! | More than one condition | `(+N more error(s))` suffix |
//!
//! "First" is pre-order traversal order. Snippet-file conditions are never
//! user-visible.

use attachkit_core::{ErrorCondition, ReferenceNode};
use serde::Serialize;
use std::fmt;

/// Severity of an aggregated status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Error,
    Warning,
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusKind::Error => f.write_str("error"),
            StatusKind::Warning => f.write_str("warning"),
        }
    }
}

/// The user-facing status of one reference tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceStatus {
    pub kind: StatusKind,
    pub details: String,
}

/// Aggregate the conditions of a tree into one status.
///
/// Pure: call it again on every tree update instead of caching the result.
pub fn aggregate_status(root: &ReferenceNode) -> Option<ReferenceStatus> {
    // (is_root, condition) in traversal order
    let conditions: Vec<(bool, &ErrorCondition)> = root
        .flatten()
        .into_iter()
        .enumerate()
        .filter_map(|(index, node)| node.error.as_ref().map(|error| (index == 0, error)))
        .filter(|(_, error)| !error.is_ignorable())
        .collect();

    let ((is_root, primary), rest) = conditions.split_first()?;

    let mut details = describe(primary);
    if !is_root {
        details = format!("Contains a broken nested reference that will be ignored: {details}");
    }

    match rest.len() {
        0 => {}
        1 => details.push_str("\n(+1 more error)"),
        n => details.push_str(&format!("\n(+{n} more errors)")),
    }

    Some(ReferenceStatus {
        kind: if *is_root {
            StatusKind::Error
        } else {
            StatusKind::Warning
        },
        details,
    })
}

fn describe(condition: &ErrorCondition) -> String {
    match condition {
        ErrorCondition::FileOpenFailed { uri } => {
            format!("Failed to open file '{}'.", uri.path())
        }
        ErrorCondition::RecursiveReference { recursive_path, .. } => {
            let chain: Vec<&str> = recursive_path.iter().map(|p| base_name(p)).collect();
            format!("Recursive reference found:\n{}", chain.join(" -> "))
        }
        ErrorCondition::Other { message } => message.clone(),
        ErrorCondition::NonPromptSnippetFile { .. } => {
            unreachable!("ignorable conditions are filtered out before rendering")
        }
    }
}

fn base_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}
