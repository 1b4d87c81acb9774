//! Context attachments held by a session.
//!
//! - [`AttachmentStore`]: identity-keyed collection with batched change events
//! - [`AdmissionController`]: caps concurrently attached files and re-admits
//!   queued files first-in, first-out as slots free up

pub mod admission;
pub mod store;

pub use admission::AdmissionController;
pub use store::{AttachmentEvent, AttachmentStore};
