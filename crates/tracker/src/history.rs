//! Bounded, deduplicated, insertion-ordered link history.
//!
//! Invariants (enforced on every write):
//! - at most `capacity` records;
//! - no two records share a normalized `link`;
//! - order is insertion order, oldest first; overflow evicts from the front.
//!
//! The store has no memory of its own. Each operation loads the JSON array
//! from session storage, works on it, and writes it back.

use crate::normalize::{normalize_url, resolve_url};
use crate::storage::SessionStorage;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub link: String,
    pub name: String,
    #[serde(default)]
    pub bookmarked: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    Added { evicted: Vec<LinkRecord> },
    AlreadyPresent,
}

pub struct HistoryStore<'a> {
    storage: &'a mut dyn SessionStorage,
    key: &'a str,
    capacity: usize,
    origin: &'a Url,
}

impl<'a> HistoryStore<'a> {
    pub fn new(
        storage: &'a mut dyn SessionStorage,
        key: &'a str,
        capacity: usize,
        origin: &'a Url,
    ) -> Self {
        Self {
            storage,
            key,
            capacity,
            origin,
        }
    }

    /// Current records, oldest first. Missing or corrupt storage reads as empty.
    pub fn records(&self) -> Vec<LinkRecord> {
        let Some(raw) = self.storage.get_item(self.key) else {
            return Vec::new();
        };
        match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(err) => {
                log::warn!(
                    target: "linktrail::history",
                    "discarding unreadable history under {:?}: {err}",
                    self.key
                );
                Vec::new()
            }
        }
    }

    /// Record `link` unless its normalized form is already present.
    pub fn add_if_absent(&mut self, link: &str, name: &str) -> AddOutcome {
        let normalized = normalize_url(link, self.origin);
        let mut records = self.records();

        if records
            .iter()
            .any(|r| normalize_url(&r.link, self.origin) == normalized)
        {
            log::debug!(target: "linktrail::history", "already tracked: {normalized}");
            return AddOutcome::AlreadyPresent;
        }

        let overflow = (records.len() + 1).saturating_sub(self.capacity);
        let evicted: Vec<LinkRecord> = records.drain(..overflow.min(records.len())).collect();
        records.push(LinkRecord {
            link: normalized,
            name: name.to_string(),
            bookmarked: false,
        });
        self.save(&records);

        log::info!(target: "linktrail::history", "updated clicked links: {records:?}");
        AddOutcome::Added { evicted }
    }

    /// Whether any record resolves to exactly `url` (query and fragment included).
    pub fn contains_resolved(&self, url: &str) -> bool {
        let Some(current) = resolve_url(url, self.origin) else {
            return false;
        };
        self.records()
            .iter()
            .filter_map(|r| resolve_url(&r.link, self.origin))
            .any(|u| u == current)
    }

    pub fn clear(&mut self) {
        self.storage.remove_item(self.key);
    }

    fn save(&mut self, records: &[LinkRecord]) {
        let json = match serde_json::to_string(records) {
            Ok(json) => json,
            Err(err) => {
                log::error!(target: "linktrail::history", "failed to serialize history: {err}");
                return;
            }
        };
        if let Err(err) = self.storage.set_item(self.key, json) {
            log::error!(target: "linktrail::history", "failed to persist history: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    const KEY: &str = "clickedLinks";

    fn origin() -> Url {
        Url::parse("https://x.sharepoint.com/").unwrap()
    }

    fn link(n: usize) -> String {
        format!("https://x.sharepoint.com/sites/S/doc{n}.pdf")
    }

    #[test]
    fn first_add_stores_normalized_record() {
        let mut storage = MemoryStorage::new();
        let origin = origin();
        let mut store = HistoryStore::new(&mut storage, KEY, 10, &origin);

        let outcome = store.add_if_absent("https://x.sharepoint.com/sites/S/doc.pdf", "Doc");

        assert_eq!(outcome, AddOutcome::Added { evicted: vec![] });
        assert_eq!(
            store.records(),
            vec![LinkRecord {
                link: "https://x.sharepoint.com/sites/S/doc.pdf".into(),
                name: "Doc".into(),
                bookmarked: false,
            }]
        );
        assert_eq!(
            storage.get_item(KEY).unwrap(),
            r#"[{"link":"https://x.sharepoint.com/sites/S/doc.pdf","name":"Doc","bookmarked":false}]"#
        );
    }

    #[test]
    fn eleventh_link_evicts_the_oldest() {
        let mut storage = MemoryStorage::new();
        let origin = origin();
        let mut store = HistoryStore::new(&mut storage, KEY, 10, &origin);
        for n in 1..=10 {
            store.add_if_absent(&link(n), &format!("L{n}"));
        }

        let outcome = store.add_if_absent(&link(11), "L11");

        let AddOutcome::Added { evicted } = outcome else {
            panic!("expected an insert");
        };
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].name, "L1");
        let names: Vec<_> = store.records().into_iter().map(|r| r.name).collect();
        let expected: Vec<_> = (2..=11).map(|n| format!("L{n}")).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn duplicates_keep_length_and_order() {
        let mut storage = MemoryStorage::new();
        let origin = origin();
        let mut store = HistoryStore::new(&mut storage, KEY, 10, &origin);
        store.add_if_absent(&link(1), "A");
        store.add_if_absent(&link(2), "B");

        let outcome = store.add_if_absent(&format!("{}?web=1#p", link(1)), "A again");

        assert_eq!(outcome, AddOutcome::AlreadyPresent);
        let names: Vec<_> = store.records().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn dedup_renormalizes_stored_links() {
        let mut storage = MemoryStorage::new();
        storage
            .set_item(
                KEY,
                r#"[{"link":"/sites/S/doc1.pdf?x=1","name":"raw","bookmarked":false}]"#.into(),
            )
            .unwrap();
        let origin = origin();
        let mut store = HistoryStore::new(&mut storage, KEY, 10, &origin);

        assert_eq!(store.add_if_absent(&link(1), "L1"), AddOutcome::AlreadyPresent);
    }

    #[test]
    fn corrupt_storage_reads_as_empty_and_is_overwritten() {
        let mut storage = MemoryStorage::new();
        storage.set_item(KEY, "{not json".into()).unwrap();
        let origin = origin();
        let mut store = HistoryStore::new(&mut storage, KEY, 10, &origin);

        assert!(store.records().is_empty());
        store.add_if_absent(&link(1), "L1");
        assert_eq!(store.records().len(), 1);
    }

    #[test]
    fn missing_bookmark_flag_defaults_to_false() {
        let mut storage = MemoryStorage::new();
        storage
            .set_item(KEY, format!(r#"[{{"link":"{}","name":"n"}}]"#, link(1)))
            .unwrap();
        let origin = origin();
        let store = HistoryStore::new(&mut storage, KEY, 10, &origin);
        assert!(!store.records()[0].bookmarked);
    }

    #[test]
    fn oversized_external_history_is_trimmed_to_capacity() {
        let mut storage = MemoryStorage::new();
        let origin = origin();
        let mut store = HistoryStore::new(&mut storage, KEY, 10, &origin);
        for n in 1..=5 {
            store.add_if_absent(&link(n), "x");
        }
        let mut small = HistoryStore::new(&mut storage, KEY, 3, &origin);

        let AddOutcome::Added { evicted } = small.add_if_absent(&link(6), "x") else {
            panic!("expected an insert");
        };
        assert_eq!(evicted.len(), 3);
        assert_eq!(small.records().len(), 3);
    }

    #[test]
    fn quota_failure_is_contained() {
        let mut storage = MemoryStorage::with_quota(20);
        let origin = origin();
        let mut store = HistoryStore::new(&mut storage, KEY, 10, &origin);

        store.add_if_absent(&link(1), "L1");

        assert!(store.records().is_empty());
    }

    #[test]
    fn clear_drops_the_storage_entry() {
        let mut storage = MemoryStorage::new();
        let origin = origin();
        let mut store = HistoryStore::new(&mut storage, KEY, 10, &origin);
        store.add_if_absent(&link(1), "L1");

        store.clear();

        assert!(store.records().is_empty());
        assert!(storage.is_empty());
    }

    #[test]
    fn contains_resolved_compares_full_urls() {
        let mut storage = MemoryStorage::new();
        let origin = origin();
        let mut store = HistoryStore::new(&mut storage, KEY, 10, &origin);
        store.add_if_absent("/sites/S/Home.aspx", "Home");

        assert!(store.contains_resolved("https://x.sharepoint.com/sites/S/Home.aspx"));
        assert!(!store.contains_resolved("https://x.sharepoint.com/sites/S/Home.aspx?a=1"));
    }
}
