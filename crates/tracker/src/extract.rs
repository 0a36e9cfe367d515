//! Destination extraction for clicked elements.

use crate::config::{ConfigError, TrackerConfig};
use css::SelectorList;
use dom::{Document, PatchKey, decode_entities};
use url::Url;

/// How a clicked element can name a destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementShape {
    /// `<a>`: destination is its resolved `href`.
    Anchor,
    /// `<button role="link">`: destination is rebuilt from the descriptor on
    /// its enclosing drop-target container plus the button's text.
    RoleLinkButton,
    Other,
}

impl ElementShape {
    pub fn of(doc: &Document, key: PatchKey) -> Self {
        match doc.element_name(key) {
            Some("a") => ElementShape::Anchor,
            Some("button") if doc.attribute(key, "role") == Some("link") => {
                ElementShape::RoleLinkButton
            }
            _ => ElementShape::Other,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedLink {
    pub href: String,
    pub name: String,
}

pub struct LinkExtractor {
    drop_target: SelectorList,
    drop_target_attribute: String,
    unnamed_label: String,
}

impl LinkExtractor {
    pub fn new(config: &TrackerConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            drop_target: config.drop_target_selector_list()?,
            drop_target_attribute: config.drop_target_attribute.clone(),
            unnamed_label: config.unnamed_link_label.clone(),
        })
    }

    /// Destination and label for `target`, or `None` if it names no destination.
    /// `base` is the document URL that relative anchors resolve against.
    pub fn extract(&self, doc: &Document, target: PatchKey, base: &Url) -> Option<ExtractedLink> {
        let href = match ElementShape::of(doc, target) {
            ElementShape::Anchor => anchor_href(doc, target, base),
            ElementShape::RoleLinkButton => self.button_href(doc, target),
            ElementShape::Other => None,
        }?;
        if href.is_empty() {
            return None;
        }

        let text = doc.inner_text(target);
        let name = match text.trim() {
            "" => self.unnamed_label.clone(),
            t => t.to_string(),
        };
        Some(ExtractedLink { href, name })
    }

    fn button_href(&self, doc: &Document, button: PatchKey) -> Option<String> {
        let container = css::closest(doc, button, &self.drop_target)?;
        let raw = doc.attribute(container, &self.drop_target_attribute)?;
        if raw.is_empty() {
            return None;
        }
        let prefix = match descriptor_path(raw) {
            Ok(prefix) => prefix,
            Err(reason) => {
                log::error!(
                    target: "linktrail::extract",
                    "error parsing {}: {reason}",
                    self.drop_target_attribute
                );
                return None;
            }
        };
        let file = doc.text_content(button);
        Some(format!("{prefix}/{}", file.trim()).replace(' ', "%20"))
    }
}

// An anchor's `href` property: resolved when possible, raw otherwise.
fn anchor_href(doc: &Document, anchor: PatchKey, base: &Url) -> Option<String> {
    let raw = doc.attribute(anchor, "href")?;
    match base.join(raw.trim()) {
        Ok(url) => Some(url.to_string()),
        Err(_) => Some(raw.to_string()),
    }
}

/// Third element of the entity-escaped JSON array descriptor.
fn descriptor_path(raw: &str) -> Result<String, String> {
    let decoded = decode_entities(raw);
    let parts: Vec<serde_json::Value> =
        serde_json::from_str(&decoded).map_err(|e| e.to_string())?;
    match parts.get(2) {
        Some(serde_json::Value::String(path)) => Ok(path.clone()),
        Some(serde_json::Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(format!("unexpected path element {other}")),
        None => Err(format!("descriptor has {} element(s), expected 3", parts.len())),
    }
}

/// Which destinations are worth remembering.
pub struct TrackingFilter {
    extensions: Vec<String>,
    path_prefixes: Vec<String>,
    host_markers: Vec<String>,
}

impl TrackingFilter {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            extensions: config
                .document_extensions
                .iter()
                .map(|e| format!(".{}", e.trim_start_matches('.').to_ascii_lowercase()))
                .collect(),
            path_prefixes: config.site_path_prefixes.clone(),
            host_markers: config.site_host_markers.clone(),
        }
    }

    pub fn is_document(&self, href: &str) -> bool {
        let lower = href.to_ascii_lowercase();
        self.extensions.iter().any(|ext| lower.ends_with(ext.as_str()))
    }

    pub fn is_site_link(&self, href: &str) -> bool {
        self.path_prefixes.iter().any(|p| href.starts_with(p.as_str()))
            || self.host_markers.iter().any(|m| href.contains(m.as_str()))
    }

    pub fn is_trackable(&self, href: &str) -> bool {
        self.is_document(href) || self.is_site_link(href)
    }
}
