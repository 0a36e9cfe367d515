//! Declarative subtrees.
//!
//! `TreeSpec` is how hosts, scenarios and tests describe content without
//! hand-numbering patch keys. Expansion allocates fresh keys from the target
//! document and emits create patches followed by the single `AppendChild`
//! that connects the subtree, so observers see one record per inserted root.

use crate::document::{Document, DomPatchError, MutationRecord};
use crate::patch::{DomPatch, PatchKey};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum TreeSpec {
    Text(String),
    Element {
        tag: String,
        #[cfg_attr(feature = "serde", serde(default))]
        attrs: BTreeMap<String, String>,
        #[cfg_attr(feature = "serde", serde(default))]
        children: Vec<TreeSpec>,
    },
}

impl TreeSpec {
    pub fn element(tag: &str) -> Self {
        TreeSpec::Element {
            tag: tag.to_string(),
            attrs: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn text(text: &str) -> Self {
        TreeSpec::Text(text.to_string())
    }

    /// Set an attribute. No-op on text nodes.
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        if let TreeSpec::Element { attrs, .. } = &mut self {
            attrs.insert(name.to_string(), value.to_string());
        }
        self
    }

    /// Append a child. No-op on text nodes.
    pub fn child(mut self, child: TreeSpec) -> Self {
        if let TreeSpec::Element { children, .. } = &mut self {
            children.push(child);
        }
        self
    }

    fn emit(
        &self,
        alloc: &mut impl FnMut() -> PatchKey,
        creates: &mut Vec<DomPatch>,
        links: &mut Vec<DomPatch>,
    ) -> PatchKey {
        let key = alloc();
        match self {
            TreeSpec::Text(text) => creates.push(DomPatch::CreateText {
                key,
                text: text.clone(),
            }),
            TreeSpec::Element {
                tag,
                attrs,
                children,
            } => {
                creates.push(DomPatch::CreateElement {
                    key,
                    name: Arc::from(tag.as_str()),
                    attributes: attrs
                        .iter()
                        .map(|(k, v)| (Arc::from(k.as_str()), Some(v.clone())))
                        .collect(),
                });
                for child in children {
                    let child_key = child.emit(alloc, creates, links);
                    links.push(DomPatch::AppendChild {
                        parent: key,
                        child: child_key,
                    });
                }
            }
        }
        key
    }
}

impl Document {
    /// A minimal `<!DOCTYPE html><html><head><title>…</title></head><body></body></html>`.
    pub fn with_title(title: &str) -> Self {
        let mut doc = Document::new();
        let root = doc.allocate_key();
        let html = TreeSpec::element("html")
            .child(TreeSpec::element("head").child(TreeSpec::element("title").child(TreeSpec::text(title))))
            .child(TreeSpec::element("body"));
        let mut patches = vec![DomPatch::CreateDocument {
            key: root,
            doctype: Some("html".to_string()),
        }];
        patches.extend(doc.expand(root, &html).1);
        // Freshly allocated keys on an empty document cannot collide.
        if let Err(err) = doc.apply(&patches) {
            log::error!(target: "dom", "failed to build skeleton document: {err}");
        }
        doc
    }

    /// Expand `spec` under `parent` and apply it. Returns the subtree root key.
    pub fn append_tree(
        &mut self,
        parent: PatchKey,
        spec: &TreeSpec,
    ) -> Result<(PatchKey, Vec<MutationRecord>), DomPatchError> {
        self.index_of(parent)?;
        let (key, patches) = self.expand(parent, spec);
        let records = self.apply(&patches)?;
        Ok((key, records))
    }

    pub fn remove(&mut self, key: PatchKey) -> Result<Vec<MutationRecord>, DomPatchError> {
        self.apply(&[DomPatch::RemoveNode { key }])
    }

    /// Swap every child of `parent` for freshly built subtrees, the way a
    /// virtual-DOM re-render replaces a region wholesale.
    pub fn replace_children(
        &mut self,
        parent: PatchKey,
        specs: &[TreeSpec],
    ) -> Result<Vec<MutationRecord>, DomPatchError> {
        self.index_of(parent)?;
        let mut patches: Vec<DomPatch> = self
            .children(parent)
            .iter()
            .map(|&key| DomPatch::RemoveNode { key })
            .collect();
        for spec in specs {
            patches.extend(self.expand(parent, spec).1);
        }
        self.apply(&patches)
    }

    fn expand(&mut self, parent: PatchKey, spec: &TreeSpec) -> (PatchKey, Vec<DomPatch>) {
        let mut creates = Vec::new();
        let mut links = Vec::new();
        let key = spec.emit(&mut || self.allocate_key(), &mut creates, &mut links);
        creates.extend(links);
        creates.push(DomPatch::AppendChild { parent, child: key });
        (key, creates)
    }
}
