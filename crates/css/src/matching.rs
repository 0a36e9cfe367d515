use crate::syntax::{Combinator, ComplexSelector, Selector, SelectorList};
use dom::{Document, PatchKey};

impl SelectorList {
    pub fn matches(&self, doc: &Document, key: PatchKey) -> bool {
        doc.is_element(key) && self.selectors.iter().any(|s| s.matches(doc, key))
    }
}

impl ComplexSelector {
    pub fn matches(&self, doc: &Document, key: PatchKey) -> bool {
        match self.compounds.len() {
            0 => false,
            n => matches_from(self, n - 1, doc, key),
        }
    }
}

// Right-to-left with backtracking over descendant combinators.
fn matches_from(sel: &ComplexSelector, index: usize, doc: &Document, key: PatchKey) -> bool {
    if !matches_compound(&sel.compounds[index], doc, key) {
        return false;
    }
    if index == 0 {
        return true;
    }
    match sel.combinators[index - 1] {
        Combinator::Child => doc
            .parent(key)
            .is_some_and(|p| doc.is_element(p) && matches_from(sel, index - 1, doc, p)),
        Combinator::Descendant => doc
            .ancestors(key)
            .filter(|a| doc.is_element(*a))
            .any(|a| matches_from(sel, index - 1, doc, a)),
    }
}

fn matches_compound(compound: &[Selector], doc: &Document, key: PatchKey) -> bool {
    compound.iter().all(|s| matches_selector(s, doc, key))
}

// Check if an element matches a single simple selector
fn matches_selector(selector: &Selector, doc: &Document, key: PatchKey) -> bool {
    match selector {
        Selector::Universal => doc.is_element(key),
        Selector::Type(t) => doc.element_name(key).is_some_and(|n| n.eq_ignore_ascii_case(t)),
        Selector::Id(want) => doc.attribute(key, "id") == Some(want.as_str()),
        Selector::Class(want) => doc.has_class(key, want),
        Selector::Attribute { name, value } => match (doc.attribute(key, name), value) {
            (Some(_), None) => true,
            (Some(actual), Some(want)) => actual == want,
            (None, _) => false,
        },
    }
}

/// Every connected element matching `list`, in document order.
pub fn query_selector_all(doc: &Document, list: &SelectorList) -> Vec<PatchKey> {
    doc.elements()
        .into_iter()
        .filter(|k| list.matches(doc, *k))
        .collect()
}

/// Nearest inclusive ancestor of `key` matching `list`.
pub fn closest(doc: &Document, key: PatchKey, list: &SelectorList) -> Option<PatchKey> {
    doc.closest(key, |k| list.matches(doc, k))
}
