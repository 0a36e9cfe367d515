use crate::document::{Document, DomPatchError, NodeKind};
use crate::patch::PatchKey;
use std::sync::Arc;

/// Elements whose contents never render as text.
const NON_RENDERING: &[&str] = &["script", "style", "template", "head", "noscript"];

/// Elements whose text starts on its own line.
const BLOCK: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

impl Document {
    pub fn doctype(&self) -> Option<&str> {
        let index = *self.live.get(&self.root()?)?;
        match &self.nodes[index].kind {
            NodeKind::Document { doctype } => doctype.as_deref(),
            _ => None,
        }
    }

    pub fn parent(&self, key: PatchKey) -> Option<PatchKey> {
        let index = *self.live.get(&key)?;
        self.nodes[index].parent
    }

    pub fn children(&self, key: PatchKey) -> &[PatchKey] {
        match self.live.get(&key) {
            Some(&index) => self.nodes[index].children.as_slice(),
            None => &[],
        }
    }

    /// Lowercased tag name, or `None` for non-element nodes.
    pub fn element_name(&self, key: PatchKey) -> Option<&str> {
        let index = *self.live.get(&key)?;
        match &self.nodes[index].kind {
            NodeKind::Element { name, .. } => Some(&**name),
            _ => None,
        }
    }

    pub fn is_element(&self, key: PatchKey) -> bool {
        self.element_name(key).is_some()
    }

    pub fn attributes(&self, key: PatchKey) -> &[(Arc<str>, Option<String>)] {
        let Some(&index) = self.live.get(&key) else {
            return &[];
        };
        match &self.nodes[index].kind {
            NodeKind::Element { attributes, .. } => attributes.as_slice(),
            _ => &[],
        }
    }

    /// Attribute value by (case-insensitive) name. Valueless attributes read as `""`.
    pub fn attribute(&self, key: PatchKey, name: &str) -> Option<&str> {
        self.attributes(key)
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_deref().unwrap_or(""))
    }

    pub fn has_attribute(&self, key: PatchKey, name: &str) -> bool {
        self.attribute(key, name).is_some()
    }

    pub fn has_class(&self, key: PatchKey, class: &str) -> bool {
        self.attribute(key, "class")
            .is_some_and(|list| list.split_ascii_whitespace().any(|c| c == class))
    }

    /// Ancestors of `key`, nearest first. Does not include `key` itself.
    pub fn ancestors(&self, key: PatchKey) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(key),
        }
    }

    /// `key` and its descendants in document (pre-)order.
    pub fn subtree(&self, key: PatchKey) -> Vec<PatchKey> {
        let mut out = Vec::new();
        if !self.contains(key) {
            return out;
        }
        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Every element connected to the document, in document order.
    pub fn elements(&self) -> Vec<PatchKey> {
        match self.root() {
            Some(root) => self
                .subtree(root)
                .into_iter()
                .filter(|k| self.is_element(*k))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Nearest inclusive ancestor satisfying `pred`.
    pub fn closest(&self, key: PatchKey, mut pred: impl FnMut(PatchKey) -> bool) -> Option<PatchKey> {
        if self.is_element(key) && pred(key) {
            return Some(key);
        }
        self.ancestors(key).find(|k| self.is_element(*k) && pred(*k))
    }

    /// Concatenation of every descendant text node, hidden or not.
    pub fn text_content(&self, key: PatchKey) -> String {
        let mut out = String::new();
        for k in self.subtree(key) {
            if let Some(text) = self.text(k) {
                out.push_str(text);
            }
        }
        out
    }

    /// Text as a reader would see it. Inline runs are concatenated as they
    /// are, non-rendering and `hidden` subtrees are skipped, block and `<br>`
    /// boundaries separate runs, and ASCII whitespace collapses to single
    /// spaces with none at either end.
    pub fn inner_text(&self, key: PatchKey) -> String {
        fn walk(doc: &Document, key: PatchKey, out: &mut String) {
            if let Some(text) = doc.text(key) {
                out.push_str(text);
                return;
            }
            let Some(name) = doc.element_name(key) else {
                for &c in doc.children(key) {
                    walk(doc, c, out);
                }
                return;
            };
            if NON_RENDERING.contains(&name) || doc.has_attribute(key, "hidden") {
                return;
            }
            if name == "br" {
                out.push('\n');
                return;
            }
            let block = BLOCK.contains(&name);
            if block {
                out.push('\n');
            }
            for &c in doc.children(key) {
                walk(doc, c, out);
            }
            if block {
                out.push('\n');
            }
        }

        let mut raw = String::new();
        walk(self, key, &mut raw);
        raw.split_ascii_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// The document title: the first `<title>` element's text with ASCII
    /// whitespace stripped and collapsed. Empty when there is none.
    pub fn title(&self) -> String {
        let Some(title) = self
            .elements()
            .into_iter()
            .find(|k| self.element_name(*k) == Some("title"))
        else {
            return String::new();
        };
        self.text_content(title)
            .split_ascii_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// First `<body>` element connected to the document.
    pub fn body(&self) -> Option<PatchKey> {
        self.elements()
            .into_iter()
            .find(|k| self.element_name(*k) == Some("body"))
    }

    pub fn require_body(&self) -> Result<PatchKey, DomPatchError> {
        self.body().ok_or(DomPatchError::MissingRoot)
    }

    fn text(&self, key: PatchKey) -> Option<&str> {
        let index = *self.live.get(&key)?;
        match &self.nodes[index].kind {
            NodeKind::Text { text } => Some(text.as_str()),
            _ => None,
        }
    }
}

pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<PatchKey>,
}

impl Iterator for Ancestors<'_> {
    type Item = PatchKey;

    fn next(&mut self) -> Option<PatchKey> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}
