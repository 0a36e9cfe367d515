//! How the host satisfies `LoadScript` requests.

use bus::{HostCommand, PageEvent};
use core_types::{LoadStatus, RequestId};
use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;

pub trait ScriptLoader {
    /// Start loading `url`. Exactly one `PageEvent::ScriptLoaded` for
    /// `request_id` must eventually reach `events`.
    fn load(&mut self, request_id: RequestId, url: String, events: &Sender<PageEvent>);

    /// The page is going away; results still in flight may be dropped.
    fn unload(&mut self) {}
}

/// Fetches over HTTP through the network runtime.
#[derive(Default)]
pub struct NetScriptLoader {
    runtime: Option<(Sender<HostCommand>, JoinHandle<()>)>,
}

impl NetScriptLoader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScriptLoader for NetScriptLoader {
    fn load(&mut self, request_id: RequestId, url: String, events: &Sender<PageEvent>) {
        let (cmd_tx, _) = self.runtime.get_or_insert_with(|| {
            let (cmd_tx, cmd_rx) = mpsc::channel();
            let handle = runtime_net::start_net_runtime(cmd_rx, events.clone());
            (cmd_tx, handle)
        });
        if cmd_tx.send(HostCommand::LoadScript { request_id, url }).is_err() {
            log::error!(target: "platform", "network runtime is gone; dropping script request {request_id}");
        }
    }

    fn unload(&mut self) {
        // Closing the command channel ends the runtime thread; fetches still
        // running report into the old page's event channel.
        self.runtime = None;
    }
}

/// Answers every request immediately with a fixed outcome.
#[derive(Clone, Debug)]
pub struct StaticScriptLoader {
    status: LoadStatus,
}

impl StaticScriptLoader {
    pub fn new(status: LoadStatus) -> Self {
        Self { status }
    }

    pub fn loaded() -> Self {
        Self::new(LoadStatus::Loaded { bytes: 0 })
    }

    pub fn failed(error: &str) -> Self {
        Self::new(LoadStatus::Failed {
            error: error.to_string(),
        })
    }
}

impl ScriptLoader for StaticScriptLoader {
    fn load(&mut self, request_id: RequestId, url: String, events: &Sender<PageEvent>) {
        let _ = events.send(PageEvent::ScriptLoaded {
            request_id,
            url,
            status: self.status.clone(),
        });
    }
}
