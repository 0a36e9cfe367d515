//! Scripted browsing sessions.
//!
//! A scenario is a JSON file describing the initial page and a list of steps:
//!
//! ```json
//! {
//!   "url": "https://contoso.sharepoint.com/sites/S/SitePages/Home.aspx",
//!   "title": "Home",
//!   "body": [{ "tag": "div", "attrs": { "id": "root" } }],
//!   "steps": [
//!     { "render": { "into": "#root", "children": [
//!         { "tag": "a", "attrs": { "href": "/sites/S/a.docx" }, "children": ["A"] } ] } },
//!     { "click": "#root a" },
//!     { "route": "/sites/S/SitePages/News.aspx" },
//!     { "advance_ms": 1000 }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use dom::{Document, TreeSpec};
use platform::SessionHost;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Vec<TreeSpec>,
    /// Outcome of the script request when it is not fetched for real.
    #[serde(default)]
    pub script: ScriptOutcome,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptOutcome {
    #[default]
    Loaded,
    Failed,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum Step {
    /// Move the virtual clock forward.
    AdvanceMs(u64),
    /// Click the first element matching a selector.
    Click(String),
    /// Client-side route change.
    Route(String),
    /// Replace the children of the first match.
    Render { into: String, children: Vec<TreeSpec> },
    /// Append to the first match.
    Append { into: String, children: Vec<TreeSpec> },
    /// Detach the first match.
    Remove(String),
    Title(String),
    /// Full page load.
    Load {
        url: String,
        #[serde(default)]
        title: String,
        #[serde(default)]
        body: Vec<TreeSpec>,
    },
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse scenario {}", path.display()))
    }

    pub fn document(&self) -> Result<Document> {
        build_document(&self.title, &self.body)
    }
}

pub fn build_document(title: &str, body: &[TreeSpec]) -> Result<Document> {
    let mut doc = Document::with_title(title);
    let root = doc.require_body()?;
    for spec in body {
        doc.append_tree(root, spec)?;
    }
    Ok(doc)
}

/// Run `steps` against an activated host.
pub fn replay(host: &mut SessionHost, steps: &[Step]) -> Result<()> {
    for (i, step) in steps.iter().enumerate() {
        apply_step(host, step).with_context(|| format!("step {} ({step:?}) failed", i + 1))?;
    }
    Ok(())
}

fn apply_step(host: &mut SessionHost, step: &Step) -> Result<()> {
    match step {
        Step::AdvanceMs(ms) => host.advance(Duration::from_millis(*ms)),
        Step::Click(selector) => {
            let result = host.click_selector(selector)?;
            log::debug!(target: "linktrail::scenario", "click {selector:?} -> {result:?}");
        }
        Step::Route(url) => host.route_to(url)?,
        Step::Render { into, children } => {
            let parent = host.query(into)?;
            host.replace_children(parent, children)?;
        }
        Step::Append { into, children } => {
            let parent = host.query(into)?;
            for child in children {
                host.append_tree(parent, child)?;
            }
        }
        Step::Remove(selector) => {
            let key = host.query(selector)?;
            host.remove(key)?;
        }
        Step::Title(title) => host.set_title(title)?,
        Step::Load { url, title, body } => {
            let doc = build_document(title, body)?;
            host.load_page(url, doc)?;
        }
    }
    Ok(())
}
