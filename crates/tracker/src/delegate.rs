//! Click interception over a mutating document.
//!
//! Registration is tracked per element: re-running [`EventDelegator::attach`]
//! after every structural change only registers elements that are new, so a
//! re-rendered region never ends up with stacked handlers.

use css::SelectorList;
use dom::{Document, PatchKey};
use std::collections::HashSet;

pub struct EventDelegator {
    selector: SelectorList,
    registered: HashSet<PatchKey>,
}

impl EventDelegator {
    pub fn new(selector: SelectorList) -> Self {
        Self {
            selector,
            registered: HashSet::new(),
        }
    }

    /// Register every matching element that is not registered yet and forget
    /// elements that have left the document. Returns the number of new
    /// registrations.
    pub fn attach(&mut self, doc: &Document) -> usize {
        self.registered.retain(|k| doc.contains(*k));
        let mut added = 0;
        for key in css::query_selector_all(doc, &self.selector) {
            if self.registered.insert(key) {
                added += 1;
            }
        }
        if added > 0 {
            log::debug!(
                target: "linktrail::delegate",
                "attached {added} click handler(s), {} total",
                self.registered.len()
            );
        }
        added
    }

    pub fn is_registered(&self, key: PatchKey) -> bool {
        self.registered.contains(&key)
    }

    pub fn registered_count(&self) -> usize {
        self.registered.len()
    }

    /// Registered elements a click on `target` bubbles through, target first.
    pub fn listeners_on_path(&self, doc: &Document, target: PatchKey) -> Vec<PatchKey> {
        std::iter::once(target)
            .chain(doc.ancestors(target))
            .filter(|k| self.registered.contains(k))
            .collect()
    }

    pub fn clear(&mut self) {
        self.registered.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_LINK_SELECTOR;
    use dom::TreeSpec;

    fn delegator() -> EventDelegator {
        EventDelegator::new(DEFAULT_LINK_SELECTOR.parse().unwrap())
    }

    #[test]
    fn repeated_attach_registers_each_element_once() {
        let mut doc = Document::with_title("t");
        let body = doc.body().unwrap();
        doc.append_tree(
            body,
            &TreeSpec::element("div")
                .attr("class", "ms-ListView-cell")
                .child(TreeSpec::element("a").attr("href", "/a")),
        )
        .unwrap();
        let mut delegator = delegator();

        assert_eq!(delegator.attach(&doc), 1);
        assert_eq!(delegator.attach(&doc), 0);
        assert_eq!(delegator.registered_count(), 1);
    }

    #[test]
    fn rerendered_regions_drop_stale_registrations() {
        let mut doc = Document::with_title("t");
        let body = doc.body().unwrap();
        let (list, _) = doc
            .append_tree(body, &TreeSpec::element("nav").child(TreeSpec::element("a")))
            .unwrap();
        let mut delegator = delegator();
        delegator.attach(&doc);
        let old = doc.children(list)[0];

        doc.replace_children(
            list,
            &[
                TreeSpec::element("a").attr("class", "ms-Nav-PaneLink"),
                TreeSpec::element("span").attr("class", "ms-DocumentLibraryLink"),
            ],
        )
        .unwrap();

        assert_eq!(delegator.attach(&doc), 2);
        assert!(!delegator.is_registered(old));
        assert_eq!(delegator.registered_count(), 2);
    }

    #[test]
    fn listeners_follow_bubbling_order() {
        let mut doc = Document::with_title("t");
        let body = doc.body().unwrap();
        let (outer, _) = doc
            .append_tree(
                body,
                &TreeSpec::element("a").attr("href", "/outer").child(
                    TreeSpec::element("button")
                        .attr("role", "link")
                        .child(TreeSpec::element("span")),
                ),
            )
            .unwrap();
        let button = doc.children(outer)[0];
        let span = doc.children(button)[0];
        let mut delegator = delegator();
        delegator.attach(&doc);

        assert_eq!(delegator.listeners_on_path(&doc, span), vec![button, outer]);
        assert_eq!(delegator.listeners_on_path(&doc, body), Vec::<PatchKey>::new());
    }
}
