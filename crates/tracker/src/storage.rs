//! Session-scoped key/value storage.
//!
//! The tracker never holds history in memory; every operation goes through
//! this capability, so hosts decide where "session" data lives and tests can
//! substitute a fake.

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("writing {key:?} needs {needed} bytes but the quota is {quota}")]
    QuotaExceeded {
        key: String,
        needed: usize,
        quota: usize,
    },
}

pub trait SessionStorage {
    fn get_item(&self, key: &str) -> Option<String>;

    fn set_item(&mut self, key: &str, value: String) -> Result<(), StorageError>;

    fn remove_item(&mut self, key: &str);
}

/// In-memory storage with an optional byte quota over all keys and values.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            items: HashMap::new(),
            quota: Some(quota),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn used_without(&self, key: &str) -> usize {
        self.items
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl SessionStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        if let Some(quota) = self.quota {
            let needed = self.used_without(key) + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    quota,
                });
            }
        }
        self.items.insert(key.to_string(), value);
        Ok(())
    }

    fn remove_item(&mut self, key: &str) {
        self.items.remove(key);
    }
}
