//! Context attachments — the unit of context a user attaches to a session.

use serde::{Deserialize, Serialize};

use crate::uri::{Range, Uri};

/// What an attachment points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttachmentValue {
    /// A whole resource.
    Uri { uri: Uri },

    /// A range inside a resource (a selection).
    Location { uri: Uri, range: Range },

    /// Anything else (variables, tool outputs, images...).
    Other { value: serde_json::Value },
}

impl AttachmentValue {
    /// The resource this value refers to, if any.
    pub fn uri(&self) -> Option<&Uri> {
        match self {
            AttachmentValue::Uri { uri } | AttachmentValue::Location { uri, .. } => Some(uri),
            AttachmentValue::Other { .. } => None,
        }
    }
}

/// One attachment held by an attachment store.
///
/// Identity is `id`: two entries with the same id are the same attachment.
/// Entries are never mutated in place once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentEntry {
    /// Unique key.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Whether this entry counts against the file limit.
    #[serde(default)]
    pub is_file: bool,

    /// Whether the entry was produced dynamically (e.g. by a `#` variable).
    #[serde(default)]
    pub is_dynamic: bool,

    pub value: AttachmentValue,
}

impl AttachmentEntry {
    /// A whole-file attachment, keyed by its URI.
    pub fn file(uri: Uri) -> Self {
        Self {
            id: uri.to_string(),
            name: uri.base_name().to_string(),
            is_file: true,
            is_dynamic: false,
            value: AttachmentValue::Uri { uri },
        }
    }

    /// A selection inside a file, keyed by URI and range.
    pub fn selection(uri: Uri, range: Range) -> Self {
        Self {
            id: format!("{uri}:{}", range.line_label()),
            name: format!("{}:{}", uri.base_name(), range.line_label()),
            is_file: true,
            is_dynamic: false,
            value: AttachmentValue::Location { uri, range },
        }
    }

    /// A non-file attachment with an arbitrary payload.
    pub fn variable(id: impl Into<String>, name: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_file: false,
            is_dynamic: true,
            value: AttachmentValue::Other { value },
        }
    }
}
