//! Live document arena.
//!
//! Invariants:
//! - `live` maps every key currently in the arena to its slot in `nodes`.
//!   Removed subtrees leave their slots behind; only `live` decides membership.
//!   Once dead slots outnumber live ones the arena is compacted, so `nodes`
//!   stays within a constant factor of the live node count.
//! - `allocated` remembers every key ever inserted so keys are never recycled.
//!   It holds one `PatchKey` per node ever created and is only reset by
//!   dropping the document.
//! - Child-list mutation records are only emitted for parents connected to the
//!   document root, mirroring what a document-wide subtree observer would see.

use crate::patch::{DomPatch, PatchKey};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomPatchError {
    #[error("patch key {0:?} is reserved")]
    InvalidKey(PatchKey),
    #[error("patch key {0:?} was already used in this document")]
    DuplicateKey(PatchKey),
    #[error("patch key {0:?} is not live")]
    MissingKey(PatchKey),
    #[error("node {0:?} has the wrong kind for this operation")]
    WrongNodeKind(PatchKey),
    #[error("node {0:?} cannot take this parent/child role")]
    InvalidParent(PatchKey),
    #[error("{before:?} is not a child of {parent:?}")]
    InvalidSibling { parent: PatchKey, before: PatchKey },
    #[error("inserting {child:?} under {parent:?} would create a cycle")]
    CycleDetected { parent: PatchKey, child: PatchKey },
    #[error("clear must be the first patch of a batch")]
    MidStreamClear,
    #[error("document has no root")]
    MissingRoot,
}

/// A child-list change under `target`, in the order it was applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: PatchKey,
    pub added: Vec<PatchKey>,
    pub removed: Vec<PatchKey>,
}

pub(crate) struct NodeRecord {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<PatchKey>,
    pub(crate) children: Vec<PatchKey>,
}

impl NodeRecord {
    fn allows_children(&self) -> bool {
        matches!(self.kind, NodeKind::Document { .. } | NodeKind::Element { .. })
    }
}

pub(crate) enum NodeKind {
    Document {
        doctype: Option<String>,
    },
    Element {
        name: Arc<str>,
        attributes: Vec<(Arc<str>, Option<String>)>,
    },
    Text {
        text: String,
    },
    Comment {
        #[allow(dead_code)]
        text: String,
    },
}

/// Arenas smaller than this are never compacted.
const COMPACT_MIN_SLOTS: usize = 64;

#[derive(Default)]
pub struct Document {
    pub(crate) nodes: Vec<NodeRecord>,
    pub(crate) live: HashMap<PatchKey, usize>,
    allocated: HashSet<PatchKey>,
    root: Option<PatchKey>,
    next_key: u32,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<PatchKey> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn contains(&self, key: PatchKey) -> bool {
        self.live.contains_key(&key)
    }

    /// Hand out a key that has never been used in this document.
    pub fn allocate_key(&mut self) -> PatchKey {
        loop {
            self.next_key = self.next_key.wrapping_add(1).max(1);
            let key = PatchKey(self.next_key);
            if !self.allocated.contains(&key) {
                return key;
            }
        }
    }

    /// Apply a batch of patches and report the child-list changes it made.
    ///
    /// A failing patch aborts the batch; patches before it stay applied.
    pub fn apply(&mut self, patches: &[DomPatch]) -> Result<Vec<MutationRecord>, DomPatchError> {
        let mut records = Vec::new();
        for (index, patch) in patches.iter().enumerate() {
            if matches!(patch, DomPatch::Clear) && index != 0 {
                return Err(DomPatchError::MidStreamClear);
            }
            self.apply_one(patch, &mut records)?;
        }
        Ok(records)
    }

    fn apply_one(
        &mut self,
        patch: &DomPatch,
        records: &mut Vec<MutationRecord>,
    ) -> Result<(), DomPatchError> {
        match patch {
            // Retired keys stay in `allocated` so stale handles never alias new nodes.
            DomPatch::Clear => {
                self.nodes.clear();
                self.live.clear();
                self.root = None;
            }
            DomPatch::CreateDocument { key, doctype } => {
                self.insert_node(
                    *key,
                    NodeKind::Document {
                        doctype: doctype.clone(),
                    },
                )?;
                self.root = Some(*key);
            }
            DomPatch::CreateElement {
                key,
                name,
                attributes,
            } => {
                let attributes = attributes
                    .iter()
                    .map(|(k, v)| (lowercase_arc(k), v.clone()))
                    .collect();
                self.insert_node(
                    *key,
                    NodeKind::Element {
                        name: lowercase_arc(name),
                        attributes,
                    },
                )?;
            }
            DomPatch::CreateText { key, text } => {
                self.insert_node(*key, NodeKind::Text { text: text.clone() })?;
            }
            DomPatch::CreateComment { key, text } => {
                self.insert_node(*key, NodeKind::Comment { text: text.clone() })?;
            }
            DomPatch::AppendChild { parent, child } => {
                self.link_child(*parent, *child, None)?;
                if self.is_connected(*parent) {
                    records.push(MutationRecord {
                        target: *parent,
                        added: vec![*child],
                        removed: Vec::new(),
                    });
                }
            }
            DomPatch::InsertBefore {
                parent,
                child,
                before,
            } => {
                self.link_child(*parent, *child, Some(*before))?;
                if self.is_connected(*parent) {
                    records.push(MutationRecord {
                        target: *parent,
                        added: vec![*child],
                        removed: Vec::new(),
                    });
                }
            }
            DomPatch::RemoveNode { key } => {
                let index = self.index_of(*key)?;
                let parent = self.nodes[index].parent;
                let was_connected = parent.is_some_and(|p| self.is_connected(p));
                if self.root == Some(*key) {
                    self.root = None;
                }
                self.remove_subtree(*key)?;
                if self.nodes.len() > COMPACT_MIN_SLOTS && self.nodes.len() > 2 * self.live.len() {
                    self.compact();
                }
                if let (Some(parent), true) = (parent, was_connected) {
                    records.push(MutationRecord {
                        target: parent,
                        added: Vec::new(),
                        removed: vec![*key],
                    });
                }
            }
            DomPatch::SetAttributes { key, attributes } => {
                let index = self.index_of(*key)?;
                match &mut self.nodes[index].kind {
                    NodeKind::Element {
                        attributes: attrs, ..
                    } => {
                        attrs.clear();
                        attrs.extend(attributes.iter().map(|(k, v)| (lowercase_arc(k), v.clone())));
                    }
                    _ => return Err(DomPatchError::WrongNodeKind(*key)),
                }
            }
            DomPatch::SetText { key, text } => {
                let index = self.index_of(*key)?;
                match &mut self.nodes[index].kind {
                    NodeKind::Text { text: existing } => {
                        existing.clear();
                        existing.push_str(text);
                    }
                    _ => return Err(DomPatchError::WrongNodeKind(*key)),
                }
            }
        }
        Ok(())
    }

    pub(crate) fn index_of(&self, key: PatchKey) -> Result<usize, DomPatchError> {
        if key == PatchKey::INVALID {
            return Err(DomPatchError::InvalidKey(key));
        }
        self.live
            .get(&key)
            .copied()
            .ok_or(DomPatchError::MissingKey(key))
    }

    fn insert_node(&mut self, key: PatchKey, kind: NodeKind) -> Result<(), DomPatchError> {
        if key == PatchKey::INVALID {
            return Err(DomPatchError::InvalidKey(key));
        }
        if self.allocated.contains(&key) {
            return Err(DomPatchError::DuplicateKey(key));
        }
        let index = self.nodes.len();
        self.nodes.push(NodeRecord {
            kind,
            parent: None,
            children: Vec::new(),
        });
        self.allocated.insert(key);
        self.live.insert(key, index);
        self.next_key = self.next_key.max(key.0);
        Ok(())
    }

    fn link_child(
        &mut self,
        parent: PatchKey,
        child: PatchKey,
        before: Option<PatchKey>,
    ) -> Result<(), DomPatchError> {
        let parent_index = self.index_of(parent)?;
        let child_index = self.index_of(child)?;
        if parent == child || self.is_descendant(child, parent) {
            return Err(DomPatchError::CycleDetected { parent, child });
        }
        if !self.nodes[parent_index].allows_children() {
            return Err(DomPatchError::InvalidParent(parent));
        }
        if self.nodes[child_index].parent.is_some() || Some(child) == self.root {
            return Err(DomPatchError::InvalidParent(child));
        }
        let position = match before {
            None => self.nodes[parent_index].children.len(),
            Some(before) => {
                self.index_of(before)?;
                self.nodes[parent_index]
                    .children
                    .iter()
                    .position(|k| *k == before)
                    .ok_or(DomPatchError::InvalidSibling { parent, before })?
            }
        };
        self.nodes[parent_index].children.insert(position, child);
        self.nodes[child_index].parent = Some(parent);
        Ok(())
    }

    fn remove_subtree(&mut self, key: PatchKey) -> Result<(), DomPatchError> {
        let index = self.index_of(key)?;
        if let Some(parent) = self.nodes[index].parent.take() {
            if let Some(&parent_index) = self.live.get(&parent) {
                self.nodes[parent_index].children.retain(|k| *k != key);
            }
        }
        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            if let Some(current_index) = self.live.remove(&current) {
                stack.append(&mut self.nodes[current_index].children);
            }
        }
        Ok(())
    }

    /// Drop dead slots and renumber the live ones.
    fn compact(&mut self) {
        let mut old: Vec<Option<NodeRecord>> = self.nodes.drain(..).map(Some).collect();
        let mut moved = Vec::with_capacity(self.live.len());
        for index in self.live.values_mut() {
            if let Some(node) = old[*index].take() {
                *index = moved.len();
                moved.push(node);
            }
        }
        log::trace!(target: "dom", "compacted arena: {} -> {} slots", old.len(), moved.len());
        self.nodes = moved;
    }

    fn is_descendant(&self, ancestor: PatchKey, maybe_descendant: PatchKey) -> bool {
        let Some(&index) = self.live.get(&ancestor) else {
            return false;
        };
        let mut stack: Vec<PatchKey> = self.nodes[index].children.clone();
        while let Some(current) = stack.pop() {
            if current == maybe_descendant {
                return true;
            }
            if let Some(&child_index) = self.live.get(&current) {
                stack.extend(self.nodes[child_index].children.iter().copied());
            }
        }
        false
    }

    /// True when `key` is the root or hangs below it.
    pub fn is_connected(&self, key: PatchKey) -> bool {
        let Some(root) = self.root else {
            return false;
        };
        let mut current = Some(key);
        while let Some(k) = current {
            if k == root {
                return true;
            }
            current = self.live.get(&k).and_then(|&i| self.nodes[i].parent);
        }
        false
    }
}

fn lowercase_arc(s: &Arc<str>) -> Arc<str> {
    if s.bytes().any(|b| b.is_ascii_uppercase()) {
        Arc::from(s.to_ascii_lowercase())
    } else {
        Arc::clone(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn el(key: u32, name: &str) -> DomPatch {
        DomPatch::CreateElement {
            key: PatchKey(key),
            name: Arc::from(name),
            attributes: Vec::new(),
        }
    }

    fn append(parent: u32, child: u32) -> DomPatch {
        DomPatch::AppendChild {
            parent: PatchKey(parent),
            child: PatchKey(child),
        }
    }

    fn skeleton() -> Document {
        let mut doc = Document::new();
        doc.apply(&[
            DomPatch::CreateDocument {
                key: PatchKey(1),
                doctype: Some("html".into()),
            },
            el(2, "HTML"),
            el(3, "body"),
            append(1, 2),
            append(2, 3),
        ])
        .unwrap();
        doc
    }

    #[test]
    fn removed_slots_are_reclaimed() {
        let mut doc = skeleton();
        for n in 0..200 {
            let key = 100 + 2 * n;
            doc.apply(&[
                el(key, "div"),
                el(key + 1, "span"),
                append(key, key + 1),
                append(3, key),
            ])
            .unwrap();
            doc.apply(&[DomPatch::RemoveNode { key: PatchKey(key) }]).unwrap();
        }

        assert_eq!(doc.len(), 3);
        assert!(doc.nodes.len() <= 2 * COMPACT_MIN_SLOTS);
        assert_eq!(doc.element_name(PatchKey(3)), Some("body"));
        assert_eq!(doc.parent(PatchKey(3)), Some(PatchKey(2)));
        assert!(doc.is_connected(PatchKey(3)));
        assert_eq!(
            doc.apply(&[el(100, "div")]),
            Err(DomPatchError::DuplicateKey(PatchKey(100)))
        );
    }

    #[test]
    fn detached_subtrees_do_not_emit_records_until_connected() {
        let mut doc = skeleton();
        let records = doc
            .apply(&[el(10, "div"), el(11, "a"), append(10, 11), append(3, 10)])
            .unwrap();
        assert_eq!(
            records,
            vec![MutationRecord {
                target: PatchKey(3),
                added: vec![PatchKey(10)],
                removed: vec![],
            }]
        );
    }

    #[test]
    fn remove_retires_the_whole_subtree() {
        let mut doc = skeleton();
        doc.apply(&[el(10, "div"), el(11, "a"), append(10, 11), append(3, 10)])
            .unwrap();
        let records = doc.apply(&[DomPatch::RemoveNode { key: PatchKey(10) }]).unwrap();
        assert_eq!(records[0].removed, vec![PatchKey(10)]);
        assert!(!doc.contains(PatchKey(10)));
        assert!(!doc.contains(PatchKey(11)));

        let err = doc.apply(&[el(11, "span")]).unwrap_err();
        assert_eq!(err, DomPatchError::DuplicateKey(PatchKey(11)));
    }

    #[test]
    fn attribute_and_text_changes_are_silent() {
        let mut doc = skeleton();
        doc.apply(&[
            el(10, "a"),
            DomPatch::CreateText {
                key: PatchKey(11),
                text: "x".into(),
            },
            append(10, 11),
            append(3, 10),
        ])
        .unwrap();
        let records = doc
            .apply(&[
                DomPatch::SetAttributes {
                    key: PatchKey(10),
                    attributes: vec![(Arc::from("HREF"), Some("/y".into()))],
                },
                DomPatch::SetText {
                    key: PatchKey(11),
                    text: "y".into(),
                },
            ])
            .unwrap();
        assert!(records.is_empty());
        assert_eq!(doc.attribute(PatchKey(10), "href"), Some("/y"));
    }

    #[test]
    fn rejects_cycles_and_mid_stream_clear() {
        let mut doc = skeleton();
        let err = doc.apply(&[append(3, 2)]).unwrap_err();
        assert_eq!(
            err,
            DomPatchError::CycleDetected {
                parent: PatchKey(3),
                child: PatchKey(2)
            }
        );
        let err = doc.apply(&[el(20, "p"), DomPatch::Clear]).unwrap_err();
        assert_eq!(err, DomPatchError::MidStreamClear);
    }

    #[test]
    fn allocated_keys_skip_used_ones() {
        let mut doc = skeleton();
        let key = doc.allocate_key();
        assert!(key.0 > 3);
        doc.apply(&[el(key.0, "p")]).unwrap();
        assert_ne!(doc.allocate_key(), key);
    }

    #[test]
    fn insert_before_places_child_ahead_of_sibling() {
        let mut doc = skeleton();
        doc.apply(&[
            el(10, "p"),
            el(11, "p"),
            append(3, 10),
            DomPatch::InsertBefore {
                parent: PatchKey(3),
                child: PatchKey(11),
                before: PatchKey(10),
            },
        ])
        .unwrap();
        assert_eq!(doc.children(PatchKey(3)), &[PatchKey(11), PatchKey(10)]);
    }
}
