//! Client-side navigation detection by polling the location.

use crate::history::{AddOutcome, HistoryStore};
use bus::HostCommand;
use core_types::TimerId;
use std::time::Duration;
use url::Url;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    Unchanged,
    /// Location moved, but to a page the history already holds.
    AlreadyRecorded,
    Recorded(AddOutcome),
}

pub struct NavigationWatcher {
    period: Duration,
    untitled_label: String,
    last_recorded_url: String,
    timer: Option<TimerId>,
}

impl NavigationWatcher {
    pub fn new(period: Duration, untitled_label: &str) -> Self {
        Self {
            period,
            untitled_label: untitled_label.to_string(),
            last_recorded_url: String::new(),
            timer: None,
        }
    }

    /// Remember the current location and ask the host for a polling interval.
    pub fn start(&mut self, location: &Url, timer: TimerId) -> HostCommand {
        self.last_recorded_url = location.to_string();
        self.timer = Some(timer);
        HostCommand::StartInterval {
            timer,
            period: self.period,
        }
    }

    pub fn stop(&mut self) -> Option<HostCommand> {
        self.timer
            .take()
            .map(|timer| HostCommand::CancelInterval { timer })
    }

    pub fn owns(&self, timer: TimerId) -> bool {
        self.timer == Some(timer)
    }

    pub fn last_recorded_url(&self) -> &str {
        &self.last_recorded_url
    }

    /// The page is about to leave for `destination`. A fresh page would start
    /// watching from there, so the destination itself is never recorded by a
    /// poll tick.
    pub fn expect_navigation(&mut self, destination: &Url) {
        self.last_recorded_url = destination.to_string();
    }

    /// One poll tick.
    pub fn poll(&mut self, location: &Url, title: &str, history: &mut HistoryStore<'_>) -> PollOutcome {
        let current = location.as_str();
        if current == self.last_recorded_url {
            return PollOutcome::Unchanged;
        }
        self.last_recorded_url = current.to_string();

        if history.contains_resolved(current) {
            log::debug!(target: "linktrail::watcher", "navigated to tracked page {current}");
            return PollOutcome::AlreadyRecorded;
        }

        let name = match title.trim() {
            "" => self.untitled_label.as_str(),
            t => t,
        };
        log::debug!(target: "linktrail::watcher", "recording navigation to {current}");
        PollOutcome::Recorded(history.add_if_absent(current, name))
    }
}
