use core_types::{LoadStatus, RequestId, TimerId};
use dom::{MutationRecord, PatchKey};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

#[derive(Debug)]
pub enum HostCommand {
    // Navigation
    Navigate {
        url: String,
    },
    // Timers
    StartInterval {
        timer: TimerId,
        period: Duration,
    },
    CancelInterval {
        timer: TimerId,
    },
    // Document observation
    ObserveMutations,
    DisconnectMutations,
    // External resources
    LoadScript {
        request_id: RequestId,
        url: String,
    },
}

#[derive(Debug)]
pub enum PageEvent {
    // Host -> tracker
    DomMutated {
        records: Vec<MutationRecord>,
    },
    TimerFired {
        timer: TimerId,
    },
    Click {
        target: PatchKey,
    },

    // Script runtime -> tracker
    ScriptLoaded {
        request_id: RequestId,
        url: String,
        status: LoadStatus,
    },
}

pub struct Bus {
    pub cmd_tx: Sender<HostCommand>,
    pub cmd_rx: Receiver<HostCommand>,
    pub evt_tx: Sender<PageEvent>, // shareable for runtimes
    pub evt_rx: Receiver<PageEvent>,
}

impl Bus {
    pub fn new() -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (evt_tx, evt_rx) = mpsc::channel();
        Self {
            cmd_tx,
            cmd_rx,
            evt_tx,
            evt_rx,
        }
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}
