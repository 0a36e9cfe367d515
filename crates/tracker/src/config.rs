use css::{SelectorError, SelectorList};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_STORAGE_KEY: &str = "clickedLinks";
pub const DEFAULT_CAPACITY: usize = 10;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_LINK_SELECTOR: &str =
    r#"a, .ms-ListView-cell a, .ms-DocumentLibraryLink, .ms-Nav-PaneLink, button[role="link"]"#;
pub const DEFAULT_DROP_TARGET_ATTRIBUTE: &str = "data-drop-target-key";
pub const DEFAULT_SCRIPT_URL: &str = "/_layouts/15/SP.RequestExecutor.js";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("`{field}` is not a valid selector list: {source}")]
    Selector {
        field: &'static str,
        #[source]
        source: SelectorError,
    },
    #[error("`{field}` {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Tracker settings. Every field has a default, so a config file only needs
/// the keys it changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
    /// Session storage key holding the JSON history.
    pub storage_key: String,
    /// Maximum number of records kept.
    pub capacity: usize,
    pub poll_interval_ms: u64,
    /// Elements that get click interception.
    pub link_selector: String,
    /// Attribute on the container of a role="link" button that carries the
    /// entity-escaped JSON descriptor.
    pub drop_target_attribute: String,
    /// File extensions that mark a destination as a document (no dot).
    pub document_extensions: Vec<String>,
    /// Path prefixes of internal site pages.
    pub site_path_prefixes: Vec<String>,
    /// Host fragments of internal site URLs.
    pub site_host_markers: Vec<String>,
    /// External script requested on activation; relative values resolve
    /// against the page origin.
    pub script_url: String,
    pub unnamed_link_label: String,
    pub untitled_page_label: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            capacity: DEFAULT_CAPACITY,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            link_selector: DEFAULT_LINK_SELECTOR.to_string(),
            drop_target_attribute: DEFAULT_DROP_TARGET_ATTRIBUTE.to_string(),
            document_extensions: ["docx", "pptx", "xlsx", "pdf", "doc", "ppt", "xls"]
                .into_iter()
                .map(String::from)
                .collect(),
            site_path_prefixes: vec!["/sites/".to_string()],
            site_host_markers: vec![".sharepoint.com".to_string()],
            script_url: DEFAULT_SCRIPT_URL.to_string(),
            unnamed_link_label: "Unnamed Link".to_string(),
            untitled_page_label: "Untitled Page".to_string(),
        }
    }
}

impl TrackerConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: TrackerConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_key.is_empty() {
            return Err(ConfigError::Invalid {
                field: "storage_key",
                reason: "must not be empty",
            });
        }
        if self.capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "capacity",
                reason: "must be at least 1",
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "poll_interval_ms",
                reason: "must be at least 1",
            });
        }
        if self.drop_target_attribute.is_empty() {
            return Err(ConfigError::Invalid {
                field: "drop_target_attribute",
                reason: "must not be empty",
            });
        }
        self.link_selector_list()?;
        self.drop_target_selector_list()?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub(crate) fn link_selector_list(&self) -> Result<SelectorList, ConfigError> {
        self.link_selector
            .parse()
            .map_err(|source| ConfigError::Selector {
                field: "link_selector",
                source,
            })
    }

    /// `div[<drop_target_attribute>]`
    pub(crate) fn drop_target_selector_list(&self) -> Result<SelectorList, ConfigError> {
        format!("div[{}]", self.drop_target_attribute)
            .parse()
            .map_err(|source| ConfigError::Selector {
                field: "drop_target_attribute",
                source,
            })
    }
}
