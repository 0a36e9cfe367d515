//! Page-level orchestration.
//!
//! Invariants:
//! - Nothing happens before `activate`; after `deactivate` every event is ignored.
//! - Storage is only touched inside a single event callback, as one
//!   load-check-mutate-save sequence, so callbacks never interleave writes.
//! - The external script is best effort: its outcome only triggers an
//!   attachment pass and never gates tracking.

use crate::config::{ConfigError, TrackerConfig};
use crate::delegate::EventDelegator;
use crate::extract::{LinkExtractor, TrackingFilter};
use crate::history::HistoryStore;
use crate::normalize::origin_base;
use crate::storage::SessionStorage;
use crate::watcher::NavigationWatcher;
use bus::{HostCommand, PageEvent};
use core_types::{LoadStatus, RequestId, TimerId};
use dom::{Document, MutationRecord, PatchKey};
use std::sync::mpsc;
use url::Url;

/// What the tracker may read and write while handling one event.
pub struct PageContext<'a> {
    pub document: &'a Document,
    pub location: &'a Url,
    pub storage: &'a mut dyn SessionStorage,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventResult {
    Ignored,
    Handled,
    /// A click was intercepted; the host must not run its default action.
    DefaultPrevented,
}

pub struct Tracker {
    config: TrackerConfig,
    extractor: LinkExtractor,
    filter: TrackingFilter,
    delegator: EventDelegator,
    watcher: NavigationWatcher,

    active: bool,
    observing: bool,
    pending_script: Option<RequestId>,
    next_request_id: RequestId,
    next_timer_id: TimerId,

    cmd_tx: Option<mpsc::Sender<HostCommand>>,
}

impl Tracker {
    pub fn new(config: TrackerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            extractor: LinkExtractor::new(&config)?,
            filter: TrackingFilter::new(&config),
            delegator: EventDelegator::new(config.link_selector_list()?),
            watcher: NavigationWatcher::new(config.poll_interval(), &config.untitled_page_label),
            config,
            active: false,
            observing: false,
            pending_script: None,
            next_request_id: 0,
            next_timer_id: 0,
            cmd_tx: None,
        })
    }

    // -- Setup Methods ---
    pub fn set_bus_sender(&mut self, tx: mpsc::Sender<HostCommand>) {
        self.cmd_tx = Some(tx);
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn last_recorded_url(&self) -> &str {
        self.watcher.last_recorded_url()
    }

    pub fn registered_count(&self) -> usize {
        self.delegator.registered_count()
    }

    /// Start tracking. Returns immediately; the script request completes later
    /// as a `PageEvent::ScriptLoaded`.
    pub fn activate(&mut self, location: &Url) {
        if self.active {
            log::warn!(target: "linktrail::tracker", "activate called twice; ignoring");
            return;
        }
        log::info!(target: "linktrail::tracker", "link tracker initialized on {location}");
        self.active = true;

        self.next_timer_id = self.next_timer_id.wrapping_add(1);
        let cmd = self.watcher.start(location, self.next_timer_id);
        self.send_cmd(cmd);

        self.observing = true;
        self.send_cmd(HostCommand::ObserveMutations);

        let script_url = match origin_base(location).join(&self.config.script_url) {
            Ok(url) => url.to_string(),
            Err(_) => self.config.script_url.clone(),
        };
        self.next_request_id = self.next_request_id.wrapping_add(1);
        self.pending_script = Some(self.next_request_id);
        self.send_cmd(HostCommand::LoadScript {
            request_id: self.next_request_id,
            url: script_url,
        });
    }

    /// Stop the poll timer and the mutation observer and drop registrations.
    pub fn deactivate(&mut self) {
        if !self.active {
            return;
        }
        if let Some(cmd) = self.watcher.stop() {
            self.send_cmd(cmd);
        }
        if self.observing {
            self.observing = false;
            self.send_cmd(HostCommand::DisconnectMutations);
        }
        self.pending_script = None;
        self.delegator.clear();
        self.active = false;
        log::info!(target: "linktrail::tracker", "link tracker stopped");
    }

    // -- Event Handling ---
    pub fn on_page_event(&mut self, ctx: &mut PageContext<'_>, evt: PageEvent) -> EventResult {
        if !self.active {
            return EventResult::Ignored;
        }
        match evt {
            PageEvent::DomMutated { records } if self.observing => {
                self.on_dom_mutated(ctx.document, &records)
            }
            PageEvent::TimerFired { timer } if self.watcher.owns(timer) => self.on_poll_tick(ctx),
            PageEvent::Click { target } => self.on_click(ctx, target),
            PageEvent::ScriptLoaded {
                request_id,
                url,
                status,
            } if self.pending_script == Some(request_id) => {
                self.on_script_loaded(ctx.document, url, status)
            }
            _ => EventResult::Ignored,
        }
    }

    fn on_dom_mutated(&mut self, doc: &Document, records: &[MutationRecord]) -> EventResult {
        log::trace!(target: "linktrail::tracker", "{} mutation record(s)", records.len());
        self.delegator.attach(doc);
        EventResult::Handled
    }

    fn on_poll_tick(&mut self, ctx: &mut PageContext<'_>) -> EventResult {
        let origin = origin_base(ctx.location);
        let title = ctx.document.title();
        let mut history = HistoryStore::new(
            ctx.storage,
            &self.config.storage_key,
            self.config.capacity,
            &origin,
        );
        self.watcher.poll(ctx.location, &title, &mut history);
        EventResult::Handled
    }

    fn on_click(&mut self, ctx: &mut PageContext<'_>, target: PatchKey) -> EventResult {
        let listeners = self.delegator.listeners_on_path(ctx.document, target);
        if listeners.is_empty() {
            return EventResult::Ignored;
        }
        // One handler run per registered element the click bubbles through,
        // each seeing the original target.
        for _ in listeners {
            self.handle_link_click(ctx, target);
        }
        EventResult::DefaultPrevented
    }

    fn handle_link_click(&mut self, ctx: &mut PageContext<'_>, target: PatchKey) {
        let Some(link) = self.extractor.extract(ctx.document, target, ctx.location) else {
            log::warn!(target: "linktrail::tracker", "no valid link found for the clicked element");
            return;
        };

        if self.filter.is_trackable(&link.href) {
            let origin = origin_base(ctx.location);
            HistoryStore::new(
                ctx.storage,
                &self.config.storage_key,
                self.config.capacity,
                &origin,
            )
            .add_if_absent(&link.href, &link.name);
        }
        match ctx.location.join(&link.href) {
            Ok(destination) => self.watcher.expect_navigation(&destination),
            Err(err) => {
                log::warn!(target: "linktrail::tracker", "cannot resolve {:?}: {err}", link.href);
            }
        }
        self.send_cmd(HostCommand::Navigate { url: link.href });
    }

    fn on_script_loaded(&mut self, doc: &Document, url: String, status: LoadStatus) -> EventResult {
        self.pending_script = None;
        match status {
            LoadStatus::Loaded { bytes } => {
                log::info!(target: "linktrail::tracker", "loaded {url} ({bytes} bytes)");
            }
            LoadStatus::Failed { error } => {
                log::error!(target: "linktrail::tracker", "failed to load {url}: {error}");
            }
        }
        self.delegator.attach(doc);
        EventResult::Handled
    }

    // -- Helpers ---
    fn send_cmd(&self, cmd: HostCommand) {
        if let Some(tx) = &self.cmd_tx {
            let _ = tx.send(cmd);
        }
    }
}
