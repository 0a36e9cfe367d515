use bus::{HostCommand, PageEvent};
use core_types::LoadStatus;
use dom::{Document, PatchKey, TreeSpec};
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;
use tracker::{
    EventResult, HistoryStore, LinkRecord, MemoryStorage, PageContext, SessionStorage, Tracker,
    TrackerConfig, origin_base,
};
use url::Url;

struct Page {
    doc: Document,
    location: Url,
    storage: MemoryStorage,
    tracker: Tracker,
    cmds: Receiver<HostCommand>,
}

impl Page {
    fn new(location: &str, body: TreeSpec) -> Self {
        let mut doc = Document::with_title("Home");
        let root = doc.body().unwrap();
        doc.append_tree(root, &body).unwrap();
        let (tx, cmds) = mpsc::channel();
        let mut tracker = Tracker::new(TrackerConfig::default()).unwrap();
        tracker.set_bus_sender(tx);
        Self {
            doc,
            location: Url::parse(location).unwrap(),
            storage: MemoryStorage::new(),
            tracker,
            cmds,
        }
    }

    fn send(&mut self, evt: PageEvent) -> EventResult {
        let mut ctx = PageContext {
            document: &self.doc,
            location: &self.location,
            storage: &mut self.storage,
        };
        self.tracker.on_page_event(&mut ctx, evt)
    }

    fn drain(&self) -> Vec<HostCommand> {
        self.cmds.try_iter().collect()
    }

    /// Activate and finish the script load so handlers are attached.
    fn boot(&mut self) {
        let location = self.location.clone();
        self.tracker.activate(&location);
        let request_id = self
            .drain()
            .into_iter()
            .find_map(|cmd| match cmd {
                HostCommand::LoadScript { request_id, .. } => Some(request_id),
                _ => None,
            })
            .unwrap();
        let result = self.send(PageEvent::ScriptLoaded {
            request_id,
            url: String::new(),
            status: LoadStatus::Loaded { bytes: 1 },
        });
        assert_eq!(result, EventResult::Handled);
    }

    fn records(&mut self) -> Vec<LinkRecord> {
        let origin = origin_base(&self.location);
        HistoryStore::new(&mut self.storage, "clickedLinks", 10, &origin).records()
    }

    fn find(&self, tag: &str) -> PatchKey {
        self.doc
            .elements()
            .into_iter()
            .find(|k| self.doc.element_name(*k) == Some(tag))
            .unwrap()
    }
}

const HOME: &str = "https://x.sharepoint.com/sites/S/SitePages/Home.aspx";

#[test]
fn activate_requests_timer_observer_and_script() {
    let mut page = Page::new(HOME, TreeSpec::element("div"));
    page.tracker.activate(&Url::parse(HOME).unwrap());

    let cmds = page.drain();
    assert_eq!(cmds.len(), 3);
    assert!(matches!(
        cmds[0],
        HostCommand::StartInterval { period, .. } if period == Duration::from_secs(1)
    ));
    assert!(matches!(cmds[1], HostCommand::ObserveMutations));
    match &cmds[2] {
        HostCommand::LoadScript { url, .. } => {
            assert_eq!(url, "https://x.sharepoint.com/_layouts/15/SP.RequestExecutor.js");
        }
        other => panic!("unexpected command {other:?}"),
    }
    assert_eq!(page.tracker.last_recorded_url(), HOME);

    page.tracker.activate(&Url::parse(HOME).unwrap());
    assert!(page.drain().is_empty());
}

#[test]
fn absolute_script_url_is_requested_unchanged() {
    let mut page = Page::new(HOME, TreeSpec::element("div"));
    let (tx, cmds) = mpsc::channel();
    page.tracker = Tracker::new(TrackerConfig {
        script_url: "https://cdn.example/lib/executor.js".into(),
        ..TrackerConfig::default()
    })
    .unwrap();
    page.tracker.set_bus_sender(tx);
    page.cmds = cmds;

    page.tracker.activate(&Url::parse(HOME).unwrap());

    let url = page
        .drain()
        .into_iter()
        .find_map(|cmd| match cmd {
            HostCommand::LoadScript { url, .. } => Some(url),
            _ => None,
        })
        .unwrap();
    assert_eq!(url, "https://cdn.example/lib/executor.js");
}

#[test]
fn events_before_activation_are_ignored() {
    let mut page = Page::new(HOME, TreeSpec::element("a").attr("href", "/sites/S/a.pdf"));
    let anchor = page.find("a");
    assert_eq!(page.send(PageEvent::Click { target: anchor }), EventResult::Ignored);
    assert!(page.storage.is_empty());
}

#[test]
fn click_on_unnamed_anchor_records_and_navigates() {
    let mut page = Page::new(HOME, TreeSpec::element("a").attr("href", "/sites/S/file.docx"));
    page.boot();
    let anchor = page.find("a");

    let result = page.send(PageEvent::Click { target: anchor });

    assert_eq!(result, EventResult::DefaultPrevented);
    assert_eq!(
        page.records(),
        vec![LinkRecord {
            link: "https://x.sharepoint.com/sites/S/file.docx".into(),
            name: "Unnamed Link".into(),
            bookmarked: false,
        }]
    );
    let cmds = page.drain();
    assert!(matches!(
        cmds.as_slice(),
        [HostCommand::Navigate { url }] if url == "https://x.sharepoint.com/sites/S/file.docx"
    ));
}

#[test]
fn untracked_destination_navigates_without_recording() {
    let mut page = Page::new(
        HOME,
        TreeSpec::element("a")
            .attr("href", "https://elsewhere.example/page")
            .child(TreeSpec::text("Out")),
    );
    page.boot();
    let anchor = page.find("a");

    assert_eq!(page.send(PageEvent::Click { target: anchor }), EventResult::DefaultPrevented);
    assert!(page.records().is_empty());
    assert!(matches!(
        page.drain().as_slice(),
        [HostCommand::Navigate { url }] if url == "https://elsewhere.example/page"
    ));
    assert_eq!(page.tracker.last_recorded_url(), "https://elsewhere.example/page");
}

#[test]
fn relative_click_destination_becomes_the_watched_location() {
    let mut page = Page::new(
        HOME,
        TreeSpec::element("a")
            .attr("href", "Other.aspx?x=1")
            .child(TreeSpec::text("Other")),
    );
    page.boot();
    let anchor = page.find("a");

    page.send(PageEvent::Click { target: anchor });

    assert_eq!(
        page.tracker.last_recorded_url(),
        "https://x.sharepoint.com/sites/S/SitePages/Other.aspx?x=1"
    );
}

#[test]
fn click_outside_registered_elements_is_ignored() {
    let mut page = Page::new(HOME, TreeSpec::element("p").child(TreeSpec::text("plain")));
    page.boot();
    let p = page.find("p");

    assert_eq!(page.send(PageEvent::Click { target: p }), EventResult::Ignored);
    assert!(page.drain().is_empty());
}

#[test]
fn invalid_descriptor_blocks_navigation_and_leaves_store_alone() {
    let mut page = Page::new(
        HOME,
        TreeSpec::element("div")
            .attr("data-drop-target-key", "[&quot;broken")
            .child(
                TreeSpec::element("button")
                    .attr("role", "link")
                    .child(TreeSpec::text("a.docx")),
            ),
    );
    page.boot();
    let button = page.find("button");

    assert_eq!(page.send(PageEvent::Click { target: button }), EventResult::DefaultPrevented);
    assert!(page.storage.get_item("clickedLinks").is_none());
    assert!(page.drain().is_empty());
}

#[test]
fn stale_script_result_is_ignored() {
    let mut page = Page::new(HOME, TreeSpec::element("a").attr("href", "/sites/S/a.pdf"));
    page.tracker.activate(&Url::parse(HOME).unwrap());
    page.drain();

    let result = page.send(PageEvent::ScriptLoaded {
        request_id: 999,
        url: String::new(),
        status: LoadStatus::Loaded { bytes: 1 },
    });

    assert_eq!(result, EventResult::Ignored);
    assert_eq!(page.tracker.registered_count(), 0);
}

#[test]
fn failed_script_still_attaches_handlers() {
    let mut page = Page::new(HOME, TreeSpec::element("a").attr("href", "/sites/S/a.pdf"));
    let location = page.location.clone();
    page.tracker.activate(&location);
    let request_id = page
        .drain()
        .into_iter()
        .find_map(|cmd| match cmd {
            HostCommand::LoadScript { request_id, .. } => Some(request_id),
            _ => None,
        })
        .unwrap();

    page.send(PageEvent::ScriptLoaded {
        request_id,
        url: String::new(),
        status: LoadStatus::Failed {
            error: "HTTP status 404".into(),
        },
    });

    assert_eq!(page.tracker.registered_count(), 1);
}

#[test]
fn poll_tick_records_route_change() {
    let mut page = Page::new(HOME, TreeSpec::element("div"));
    let location = page.location.clone();
    page.tracker.activate(&location);
    let timer = page
        .drain()
        .into_iter()
        .find_map(|cmd| match cmd {
            HostCommand::StartInterval { timer, .. } => Some(timer),
            _ => None,
        })
        .unwrap();

    assert_eq!(page.send(PageEvent::TimerFired { timer }), EventResult::Handled);
    assert!(page.records().is_empty());

    page.location = Url::parse("https://x.sharepoint.com/sites/S/SitePages/News.aspx").unwrap();
    page.send(PageEvent::TimerFired { timer });
    let records = page.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "Home");

    assert_eq!(page.send(PageEvent::TimerFired { timer: timer + 1 }), EventResult::Ignored);
}

#[test]
fn deactivate_cancels_timer_and_observer() {
    let mut page = Page::new(HOME, TreeSpec::element("a").attr("href", "/sites/S/a.pdf"));
    page.boot();
    assert_eq!(page.tracker.registered_count(), 1);

    page.tracker.deactivate();

    let cmds = page.drain();
    assert!(matches!(
        cmds.as_slice(),
        [HostCommand::CancelInterval { .. }, HostCommand::DisconnectMutations]
    ));
    assert!(!page.tracker.is_active());
    assert_eq!(page.tracker.registered_count(), 0);
    let anchor = page.find("a");
    assert_eq!(page.send(PageEvent::Click { target: anchor }), EventResult::Ignored);
}
