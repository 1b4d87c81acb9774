//! Instruction attachments — prompt and instruction files attached to a
//! session, each backed by a tree of the files it references.
//!
//! The flow:
//!
//! 1. A host adds a URI to the [`InstructionAttachmentRegistry`]
//! 2. The registry creates an [`InstructionAttachment`] and starts resolving
//!    its reference tree through a [`ReferenceResolver`](attachkit_core::ReferenceResolver)
//! 3. Every tree update re-publishes a registry change
//! 4. The host reads [`InstructionAttachment::status`], which runs
//!    [`aggregate_status`] over the latest snapshot
//!
//! [`FsInstructionSource`] finds candidate instruction files and
//! [`FsReferenceResolver`] resolves references on the local filesystem.

pub mod attachment;
pub mod discovery;
pub mod registry;
pub mod resolver;
pub mod status;

pub use attachment::{AttachmentObserver, InstructionAttachment};
pub use discovery::{FsInstructionSource, InstructionFileSource};
pub use registry::{InstructionAttachmentRegistry, RegistryEvent};
pub use resolver::{is_prompt_file, parse_references, FsReferenceResolver, PROMPT_EXTENSIONS};
pub use status::{aggregate_status, ReferenceStatus, StatusKind};
