//! Filesystem reference resolver.
//!
//! Reads an instruction file, finds the files it references and follows
//! them recursively, attaching an [`ErrorCondition`] to every node that
//! cannot be used. Two reference forms are recognised:
//!
//! - `#file:<path>`
//! - markdown links `[text](<path>)` whose target is not a URL or an anchor
//!
//! Relative paths resolve against the directory of the referencing file.
//! Anything inside code blocks or inline code spans is ignored.

use std::future::Future;
use std::pin::Pin;
use std::sync::LazyLock;

use attachkit_core::{
    ErrorCondition, ReferenceNode, ReferenceResolver, ResolveError, ResolverEvent, Uri,
};
use regex_lite::Regex;
use tokio::sync::mpsc;
use tracing::debug;

/// File name suffixes of files that are followed.
pub const PROMPT_EXTENSIONS: &[&str] = &[".prompt.md", ".instructions.md"];

const DEFAULT_MAX_DEPTH: usize = 16;

/// Whether a referenced file is itself an instruction file.
pub fn is_prompt_file(uri: &Uri) -> bool {
    let name = uri.base_name();
    PROMPT_EXTENSIONS.iter().any(|ext| name.len() > ext.len() && name.ends_with(ext))
}

static FILE_REF_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"#file:([^\s`'"<>()\[\],;]+)"#).expect("file reference regex"));

static LINK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]\n]*\]\(([^)\n]*)\)").expect("markdown link regex"));

// Fenced blocks (closed or running to the end), indented blocks that are not
// list items, and inline code spans.
static CODE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*```[\s\S]*?^[ \t]*```|^[ \t]*~~~[\s\S]*?^[ \t]*~~~|^[ \t]*(?:```|~~~)[\s\S]*|^(?: {4}|\t)[^-*+0-9\s].*$|`[^`\n]+`",
    )
    .expect("code block regex")
});

/// Reference targets in `content`, in order of first appearance.
pub fn parse_references(content: &str) -> Vec<String> {
    let code: Vec<(usize, usize)> = CODE_REGEX
        .find_iter(content)
        .map(|m| (m.start(), m.end()))
        .collect();
    let in_code = |offset: usize| code.iter().any(|&(start, end)| offset >= start && offset < end);

    let mut hits: Vec<(usize, &str)> = Vec::new();
    for cap in FILE_REF_REGEX.captures_iter(content) {
        let (Some(whole), Some(target)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        if !in_code(whole.start()) {
            hits.push((whole.start(), target.as_str().trim_end_matches(['.', ':', '!', '?'])));
        }
    }
    for cap in LINK_REGEX.captures_iter(content) {
        let (Some(whole), Some(inner)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        // `[text](path "title")` and `[text](<path>)`
        let target = inner
            .as_str()
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .trim_start_matches('<')
            .trim_end_matches('>');
        if !in_code(whole.start()) && !is_external_link(target) {
            hits.push((whole.start(), target));
        }
    }
    hits.sort_by_key(|&(offset, _)| offset);

    let mut found: Vec<String> = Vec::new();
    for (_, target) in hits {
        if !target.is_empty() && !found.iter().any(|t| t == target) {
            found.push(target.to_string());
        }
    }
    found
}

/// Resolves reference trees from local files.
///
/// Each call to [`resolve`](ReferenceResolver::resolve) spawns a Tokio task
/// that publishes the full tree once and then closes the channel.
pub struct FsReferenceResolver {
    max_depth: usize,
}

impl FsReferenceResolver {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth: max_depth.max(1),
        }
    }

    /// Resolve a whole tree directly, without the update channel.
    pub async fn resolve_tree(&self, uri: Uri) -> ReferenceNode {
        resolve_node(uri, Vec::new(), self.max_depth).await
    }
}

impl Default for FsReferenceResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceResolver for FsReferenceResolver {
    fn resolve(&self, uri: &Uri) -> mpsc::UnboundedReceiver<ResolverEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let uri = uri.clone();
        let max_depth = self.max_depth;

        tokio::spawn(async move {
            let tree = resolve_node(uri, Vec::new(), max_depth).await;
            // Receiver gone = attachment disposed, nothing to do
            let _ = tx.send(ResolverEvent::Updated(tree));
        });

        rx
    }
}

/// Resolve `uri`; `chain` holds the files from the root down to its parent.
fn resolve_node(
    uri: Uri,
    mut chain: Vec<Uri>,
    max_depth: usize,
) -> Pin<Box<dyn Future<Output = ReferenceNode> + Send>> {
    Box::pin(async move {
        let node = ReferenceNode::new(uri.clone());

        let Some(path) = uri.to_file_path() else {
            return node.with_error(ErrorCondition::Other {
                message: format!("Unsupported URI scheme '{}'.", uri.scheme()),
            });
        };

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                let err = ResolveError::Io {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                };
                debug!(uri = %uri, error = %err, "Failed to read referenced file");
                return node.with_error(ErrorCondition::FileOpenFailed { uri });
            }
        };

        chain.push(uri.clone());
        let mut children = Vec::new();

        for target in parse_references(&content) {
            let child = uri.resolve_relative(&target);

            if let Some(first) = chain.iter().position(|seen| seen.key() == child.key()) {
                let mut recursive_path: Vec<String> =
                    chain[first..].iter().map(|u| u.path().to_string()).collect();
                recursive_path.push(child.path().to_string());
                children.push(ReferenceNode::new(child.clone()).with_error(
                    ErrorCondition::RecursiveReference {
                        uri: child,
                        recursive_path,
                    },
                ));
                continue;
            }

            if !is_prompt_file(&child) {
                children.push(
                    ReferenceNode::new(child.clone())
                        .with_error(ErrorCondition::NonPromptSnippetFile { uri: child }),
                );
                continue;
            }

            if chain.len() >= max_depth {
                children.push(ReferenceNode::new(child.clone()).with_error(ErrorCondition::Other {
                    message: format!(
                        "Reference depth limit of {max_depth} reached at '{}'.",
                        child.path()
                    ),
                }));
                continue;
            }

            children.push(resolve_node(child, chain.clone(), max_depth).await);
        }

        node.with_children(children)
    })
}
