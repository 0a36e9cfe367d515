//! Session link history.
//!
//! Remembers the last few documents and site pages a user opened during a
//! browser session. Clicks on link-like elements and client-side route changes
//! both feed a bounded, deduplicated list kept in session storage.
//!
//! The crate never touches a real page. Hosts feed it [`bus::PageEvent`]s
//! together with a [`PageContext`] and carry out the [`bus::HostCommand`]s it
//! sends back.

mod config;
mod delegate;
mod extract;
mod history;
mod normalize;
mod storage;
mod tracker;
mod watcher;

pub use config::{
    ConfigError, DEFAULT_CAPACITY, DEFAULT_DROP_TARGET_ATTRIBUTE, DEFAULT_LINK_SELECTOR,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_SCRIPT_URL, DEFAULT_STORAGE_KEY, TrackerConfig,
};
pub use delegate::EventDelegator;
pub use extract::{ElementShape, ExtractedLink, LinkExtractor, TrackingFilter};
pub use history::{AddOutcome, HistoryStore, LinkRecord};
pub use normalize::{normalize_url, origin_base, resolve_url};
pub use storage::{MemoryStorage, SessionStorage, StorageError};
pub use tracker::{EventResult, PageContext, Tracker};
pub use watcher::{NavigationWatcher, PollOutcome};
