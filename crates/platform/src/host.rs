//! A headless page that runs the tracker.
//!
//! Invariants:
//! - The host owns the document, the location, session storage and the clock;
//!   the tracker only sees them through a `PageContext` while handling one event.
//! - Every public mutator ends with `pump`, so commands the tracker sends in
//!   response have been carried out by the time the call returns.
//! - Mutation records are delivered only while the tracker observes.
//! - `load_page` behaves like a full page load: the tracker and every page
//!   resource are rebuilt, session storage survives.

use crate::loader::ScriptLoader;
use crate::timers::IntervalTimers;
use bus::{Bus, HostCommand, PageEvent};
use css::{SelectorError, SelectorList};
use dom::{Document, DomPatch, DomPatchError, MutationRecord, PatchKey, TreeSpec};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};
use tracker::{
    ConfigError, EventResult, HistoryStore, LinkRecord, MemoryStorage, PageContext, Tracker,
    TrackerConfig, origin_base,
};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("invalid location {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Dom(#[from] DomPatchError),
    #[error("invalid selector {selector:?}: {source}")]
    Selector {
        selector: String,
        #[source]
        source: SelectorError,
    },
    #[error("no element matches {0:?}")]
    NoMatch(String),
}

pub struct SessionHost {
    document: Document,
    location: Url,
    storage: MemoryStorage,
    tracker: Tracker,

    cmd_tx: Sender<HostCommand>,
    cmd_rx: Receiver<HostCommand>,
    evt_tx: Sender<PageEvent>,
    evt_rx: Receiver<PageEvent>,

    timers: IntervalTimers,
    loader: Box<dyn ScriptLoader>,
    observing: bool,
    script_settled: bool,
    navigations: Vec<String>,
}

impl SessionHost {
    pub fn new(
        location: &str,
        document: Document,
        config: TrackerConfig,
        loader: Box<dyn ScriptLoader>,
    ) -> Result<Self, HostError> {
        let location = parse_location(location)?;
        let Bus {
            cmd_tx,
            cmd_rx,
            evt_tx,
            evt_rx,
        } = Bus::new();
        let mut tracker = Tracker::new(config)?;
        tracker.set_bus_sender(cmd_tx.clone());
        Ok(Self {
            document,
            location,
            storage: MemoryStorage::new(),
            tracker,
            cmd_tx,
            cmd_rx,
            evt_tx,
            evt_rx,
            timers: IntervalTimers::new(),
            loader,
            observing: false,
            script_settled: false,
            navigations: Vec::new(),
        })
    }

    // -- Accessors ---
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn location(&self) -> &Url {
        &self.location
    }

    pub fn storage(&self) -> &MemoryStorage {
        &self.storage
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn is_observing(&self) -> bool {
        self.observing
    }

    pub fn now(&self) -> Duration {
        self.timers.now()
    }

    /// Destinations the host navigated to, oldest first.
    pub fn navigations(&self) -> &[String] {
        &self.navigations
    }

    /// The stored history, oldest first.
    pub fn history(&mut self) -> Vec<LinkRecord> {
        let config = self.tracker.config();
        let origin = origin_base(&self.location);
        HistoryStore::new(&mut self.storage, &config.storage_key, config.capacity, &origin).records()
    }

    pub fn body(&self) -> Result<PatchKey, HostError> {
        Ok(self.document.require_body()?)
    }

    // -- Lifecycle ---
    pub fn activate(&mut self) {
        self.tracker.activate(&self.location);
        self.pump();
    }

    /// Replace the page as a full navigation would.
    pub fn load_page(&mut self, location: &str, document: Document) -> Result<(), HostError> {
        let location = parse_location(location)?;
        let mut tracker = Tracker::new(self.tracker.config().clone())?;

        self.tracker.deactivate();
        self.pump();
        self.loader.unload();

        // Late results addressed to the old page must not reach the new one.
        let (evt_tx, evt_rx) = mpsc::channel();
        self.evt_tx = evt_tx;
        self.evt_rx = evt_rx;

        tracker.set_bus_sender(self.cmd_tx.clone());
        self.tracker = tracker;
        self.document = document;
        self.location = location;
        self.timers.clear();
        self.observing = false;
        self.script_settled = false;

        log::info!(target: "platform", "loaded page {}", self.location);
        self.activate();
        Ok(())
    }

    /// Block until the pending script settles or `timeout` passes. Returns
    /// whether a script result was delivered.
    pub fn wait_for_script(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.script_settled {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.evt_rx.recv_timeout(remaining) {
                Ok(evt) => {
                    self.dispatch(evt);
                    self.pump();
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    log::warn!(target: "platform", "script did not settle within {timeout:?}");
                    return false;
                }
            }
        }
        true
    }

    // -- Document ---
    pub fn append_tree(&mut self, parent: PatchKey, spec: &TreeSpec) -> Result<PatchKey, HostError> {
        let (key, records) = self.document.append_tree(parent, spec)?;
        self.notify(records);
        Ok(key)
    }

    pub fn remove(&mut self, key: PatchKey) -> Result<(), HostError> {
        let records = self.document.remove(key)?;
        self.notify(records);
        Ok(())
    }

    pub fn replace_children(&mut self, parent: PatchKey, children: &[TreeSpec]) -> Result<(), HostError> {
        let records = self.document.replace_children(parent, children)?;
        self.notify(records);
        Ok(())
    }

    pub fn apply(&mut self, patches: &[DomPatch]) -> Result<(), HostError> {
        let records = self.document.apply(patches)?;
        self.notify(records);
        Ok(())
    }

    /// Rewrite the text of the first `<title>`, creating one in `<head>` if needed.
    pub fn set_title(&mut self, title: &str) -> Result<(), HostError> {
        let doc = &self.document;
        let existing = doc
            .elements()
            .into_iter()
            .find(|k| doc.element_name(*k) == Some("title"));
        match existing {
            Some(key) => self.replace_children(key, &[TreeSpec::text(title)]),
            None => {
                let head = doc
                    .elements()
                    .into_iter()
                    .find(|k| doc.element_name(*k) == Some("head"))
                    .ok_or(DomPatchError::MissingRoot)?;
                let spec = TreeSpec::element("title").child(TreeSpec::text(title));
                self.append_tree(head, &spec).map(|_| ())
            }
        }
    }

    /// First element matching `selector`, in document order.
    pub fn query(&self, selector: &str) -> Result<PatchKey, HostError> {
        let list: SelectorList = selector.parse().map_err(|source| HostError::Selector {
            selector: selector.to_string(),
            source,
        })?;
        css::query_selector_all(&self.document, &list)
            .into_iter()
            .next()
            .ok_or_else(|| HostError::NoMatch(selector.to_string()))
    }

    // -- Input ---
    /// Click `target`. When nothing intercepts the click, an enclosing anchor
    /// navigates as usual.
    pub fn click(&mut self, target: PatchKey) -> EventResult {
        let result = self.dispatch(PageEvent::Click { target });
        self.pump();
        if result == EventResult::Ignored {
            self.follow_anchor(target);
        }
        result
    }

    pub fn click_selector(&mut self, selector: &str) -> Result<EventResult, HostError> {
        let target = self.query(selector)?;
        Ok(self.click(target))
    }

    /// Client-side route change: the location moves, the page stays.
    pub fn route_to(&mut self, url: &str) -> Result<(), HostError> {
        self.location = self.location.join(url).map_err(|source| HostError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        log::debug!(target: "platform", "route changed to {}", self.location);
        Ok(())
    }

    /// Let `by` pass on the virtual clock, firing due timers in order.
    pub fn advance(&mut self, by: Duration) {
        let deadline = self.timers.now() + by;
        while let Some(timer) = self.timers.pop_due(deadline) {
            self.dispatch(PageEvent::TimerFired { timer });
            self.pump();
        }
        self.timers.settle(deadline);
    }

    // -- Command Handling ---
    /// Carry out pending commands and deliver pending events until both
    /// queues are empty.
    pub fn pump(&mut self) {
        loop {
            let mut progressed = false;
            while let Ok(cmd) = self.cmd_rx.try_recv() {
                self.on_host_command(cmd);
                progressed = true;
            }
            while let Ok(evt) = self.evt_rx.try_recv() {
                self.dispatch(evt);
                progressed = true;
            }
            if !progressed {
                break;
            }
        }
    }

    fn on_host_command(&mut self, cmd: HostCommand) {
        match cmd {
            HostCommand::Navigate { url } => self.navigate(&url),
            HostCommand::StartInterval { timer, period } => {
                log::trace!(target: "platform", "start interval {timer} every {period:?}");
                self.timers.start(timer, period);
            }
            HostCommand::CancelInterval { timer } => {
                self.timers.cancel(timer);
            }
            HostCommand::ObserveMutations => self.observing = true,
            HostCommand::DisconnectMutations => self.observing = false,
            HostCommand::LoadScript { request_id, url } => {
                log::debug!(target: "platform", "loading script {url} (request {request_id})");
                self.loader.load(request_id, url, &self.evt_tx);
            }
        }
    }

    fn dispatch(&mut self, evt: PageEvent) -> EventResult {
        if matches!(evt, PageEvent::ScriptLoaded { .. }) {
            self.script_settled = true;
        }
        let mut ctx = PageContext {
            document: &self.document,
            location: &self.location,
            storage: &mut self.storage,
        };
        self.tracker.on_page_event(&mut ctx, evt)
    }

    fn notify(&mut self, records: Vec<MutationRecord>) {
        if self.observing && !records.is_empty() {
            let _ = self.evt_tx.send(PageEvent::DomMutated { records });
        }
        self.pump();
    }

    fn navigate(&mut self, url: &str) {
        match self.location.join(url) {
            Ok(next) => {
                log::info!(target: "platform", "navigating to {next}");
                self.navigations.push(next.to_string());
                self.location = next;
            }
            Err(err) => log::warn!(target: "platform", "cannot navigate to {url:?}: {err}"),
        }
    }

    fn follow_anchor(&mut self, target: PatchKey) {
        let doc = &self.document;
        let href = doc
            .closest(target, |k| doc.element_name(k) == Some("a"))
            .and_then(|a| doc.attribute(a, "href"))
            .map(str::to_string);
        if let Some(href) = href {
            self.navigate(&href);
        }
    }
}

fn parse_location(url: &str) -> Result<Url, HostError> {
    Url::parse(url).map_err(|source| HostError::InvalidUrl {
        url: url.to_string(),
        source,
    })
}
