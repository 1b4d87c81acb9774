//! # attachkit Core
//!
//! Domain types, traits, and error definitions for attachkit, the context
//! attachment model behind chat and edit sessions. This crate has **no
//! framework dependencies** beyond `tokio::sync` — it defines the model that
//! the attachment store, admission controller, and instruction registry are
//! built against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here:
//! - [`ReferenceResolver`] produces reference trees for instruction files
//! - [`FileLimitSource`] answers the current file attachment limit
//!
//! Implementations live in their respective crates, so hosts and tests can
//! swap them freely.

pub mod attachment;
pub mod error;
pub mod event;
pub mod limit;
pub mod reference;
pub mod uri;

// Re-export key types at crate root for ergonomics
pub use attachment::{AttachmentEntry, AttachmentValue};
pub use error::{DiscoveryError, Error, ResolveError, Result};
pub use event::EventBus;
pub use limit::{FileLimitSource, SharedFileLimit};
pub use reference::{ErrorCondition, ReferenceNode, ReferenceResolver, ResolverEvent};
pub use uri::{Range, Uri};
