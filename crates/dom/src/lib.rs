//! Live document model for hosting page-level trackers.
//!
//! The document is an arena of nodes addressed by [`PatchKey`]. Hosts change it
//! only through [`DomPatch`] batches (directly or via [`TreeSpec`]), and every
//! batch reports the child-list [`MutationRecord`]s an observer of the whole
//! document would receive.

mod document;
mod entities;
mod patch;
mod query;
mod tree;

pub use crate::document::{Document, DomPatchError, MutationRecord};
pub use crate::entities::decode_entities;
pub use crate::patch::{DomPatch, PatchKey};
pub use crate::query::Ancestors;
pub use crate::tree::TreeSpec;
