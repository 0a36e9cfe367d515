//! Incremental DOM patch protocol.
//!
//! Hosts mutate a [`Document`](crate::Document) exclusively through these
//! operations, which is what lets the document report structural changes to
//! observers.
//!
//! Invariants:
//! - Patches are applied in order.
//! - References must point to live keys at the time they are used (except the
//!   `key` in create operations).
//! - `PatchKey::INVALID` is never valid in a patch stream.
//! - A key is never reused within a document, even after its node is removed.
//! - `Clear` is only valid as the first patch of a batch.
//! - Element and attribute names are lowercased on creation.
//! - Operations must not create cycles; a node has at most one parent.

use std::sync::Arc;

/// Stable node identity within a document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatchKey(pub u32);

impl PatchKey {
    /// Reserved sentinel for "unassigned/invalid" identity.
    pub const INVALID: PatchKey = PatchKey(0);
}

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DomPatch {
    /// Drop every node. Only valid as the first patch of a batch.
    Clear,
    CreateDocument {
        key: PatchKey,
        doctype: Option<String>,
    },
    CreateElement {
        key: PatchKey,
        name: Arc<str>,
        attributes: Vec<(Arc<str>, Option<String>)>,
    },
    CreateText { key: PatchKey, text: String },
    CreateComment { key: PatchKey, text: String },
    AppendChild { parent: PatchKey, child: PatchKey },
    InsertBefore {
        parent: PatchKey,
        child: PatchKey,
        before: PatchKey,
    },
    /// Remove a node and its entire subtree. Keys in the subtree stay retired.
    RemoveNode { key: PatchKey },
    /// Replace all attributes on an element node.
    SetAttributes {
        key: PatchKey,
        attributes: Vec<(Arc<str>, Option<String>)>,
    },
    /// Replace the text of a text node.
    SetText { key: PatchKey, text: String },
}
