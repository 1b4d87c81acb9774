//! File reference trees — the contract between a reference resolver and the
//! code that reports on it.
//!
//! A resolver walks an instruction file and the files it references, producing
//! a tree of [`ReferenceNode`]s. Any node may carry an [`ErrorCondition`].
//! Consumers treat each tree they receive as an immutable snapshot: the
//! resolver publishes a fresh snapshot whenever anything inside it changes.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::uri::Uri;

/// Why a reference could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorCondition {
    /// The referenced file could not be read.
    FileOpenFailed { uri: Uri },

    /// The reference closes a cycle. `recursive_path` lists the files in the
    /// order the cycle was walked, ending with the repeated file.
    RecursiveReference { uri: Uri, recursive_path: Vec<String> },

    /// The referenced file is not a prompt file and is not followed. Only
    /// meaningful to the resolver.
    NonPromptSnippetFile { uri: Uri },

    /// Any other failure.
    Other { message: String },
}

impl ErrorCondition {
    /// Ignorable conditions are never shown to the user.
    pub fn is_ignorable(&self) -> bool {
        matches!(self, ErrorCondition::NonPromptSnippetFile { .. })
    }
}

/// One file reference and the references it contains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceNode {
    pub uri: Uri,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCondition>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ReferenceNode>,
}

impl ReferenceNode {
    /// An unresolved node: no error, no children.
    pub fn new(uri: Uri) -> Self {
        Self {
            uri,
            error: None,
            children: Vec::new(),
        }
    }

    pub fn with_error(mut self, error: ErrorCondition) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_children(mut self, children: Vec<ReferenceNode>) -> Self {
        self.children = children;
        self
    }

    /// Pre-order traversal, starting with `self`.
    pub fn flatten(&self) -> Vec<&ReferenceNode> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }
}

/// Updates published by a resolver for one root reference.
#[derive(Debug, Clone)]
pub enum ResolverEvent {
    /// A fresh snapshot of the whole tree.
    Updated(ReferenceNode),

    /// The reference reached a state it cannot recover from; its owner
    /// should dispose of it.
    Disposed,
}

/// Produces reference trees for root URIs.
///
/// `resolve` must return immediately; resolution work happens in the
/// background and is reported on the returned channel. When the channel
/// closes, the last published snapshot is final.
pub trait ReferenceResolver: Send + Sync {
    fn resolve(&self, uri: &Uri) -> mpsc::UnboundedReceiver<ResolverEvent>;
}
