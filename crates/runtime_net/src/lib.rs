use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender};
use std::thread;

use bus::{HostCommand, PageEvent};
use net::{ScriptFetch, fetch_script};

/// Serve `LoadScript` commands until the command channel closes.
///
/// Every request produces exactly one `PageEvent::ScriptLoaded`, success or
/// failure; other commands are not this runtime's business and are dropped.
pub fn start_net_runtime(cmd_rx: Receiver<HostCommand>, evt_tx: Sender<PageEvent>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                HostCommand::LoadScript { request_id, url } => {
                    let evt_tx = evt_tx.clone();
                    fetch_script(
                        request_id,
                        url,
                        Arc::new(move |fetch: ScriptFetch| {
                            log::debug!(
                                target: "runtime_net",
                                "request {} finished in {} ms",
                                fetch.request_id,
                                fetch.duration_ms
                            );
                            let _ = evt_tx.send(PageEvent::ScriptLoaded {
                                request_id: fetch.request_id,
                                url: fetch.url,
                                status: fetch.status,
                            });
                        }),
                    );
                }
                other => {
                    log::trace!(target: "runtime_net", "ignoring {other:?}");
                }
            }
        }
    })
}
