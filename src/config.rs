//! Declarative per-channel rulesets.
//!
//! Every supported news site ("channel") is described by a [`ChannelConfig`]:
//! CSS selectors for the article fields, the date format, which URL prefixes
//! use desktop markup, and how to query its search endpoint. The built-in
//! document lives in `conf/channels.json` and is compiled into the binary;
//! a replacement can be loaded from disk with [`ChannelRegistry::from_path`].
//!
//! The registry is loaded once at startup and never mutated afterwards.

use crate::error::ConfigError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, instrument};

const BUILTIN_CHANNELS: &str = include_str!("../conf/channels.json");

/// Which markup variant of a channel applies to a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    Desktop,
    Mobile,
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layout::Desktop => f.write_str("desktop"),
            Layout::Mobile => f.write_str("mobile"),
        }
    }
}

/// A URL prefix that selects a layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutRule {
    pub prefix: String,
    pub layout: Layout,
}

/// Rewrites a desktop host to the channel's mobile-only host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostRewrite {
    pub from: String,
    pub to: String,
}

/// Selectors for the fields of one article page.
///
/// For HTML documents the selectors are CSS selectors; for JSON documents
/// they are `>`-delimited key paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleLayout {
    pub title_node: String,
    pub date_node: String,
    /// Empty means the channel has no byline element and the author is
    /// scanned from the body text.
    #[serde(default)]
    pub author_node: String,
    pub article_node: String,
    pub date_format: String,
    #[serde(default)]
    pub date_pattern: Option<String>,
    /// `date_pattern`, compiled when the registry is loaded.
    #[serde(skip)]
    pub(crate) date_regex: Option<Regex>,
}

/// How to query a channel's search endpoint and read its result pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Query URL template with `${PAGE}` and `${KEYWORD}` placeholders.
    pub url: String,
    pub result_node: String,
    pub title_node: String,
    pub link_node: String,
    pub date_node: String,
    pub date_format: String,
    #[serde(default)]
    pub date_pattern: Option<String>,
    #[serde(skip)]
    pub(crate) date_regex: Option<Regex>,
    /// strftime formats rendering the date range tokens appended to the query.
    #[serde(default)]
    pub begin_date_format: Option<String>,
    #[serde(default)]
    pub end_date_format: Option<String>,
    /// Selector of the element carrying the total page count.
    #[serde(default)]
    pub last_page: Option<String>,
    #[serde(default)]
    pub page_pattern: Option<String>,
    #[serde(skip)]
    pub(crate) page_regex: Option<Regex>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub date_range: bool,
    #[serde(default)]
    pub max_span_days: Option<i64>,
    /// Result pages are large and sorted newest first, so date-bounded
    /// queries may binary-search for their first page.
    #[serde(default)]
    pub page_jump: bool,
}

fn default_true() -> bool {
    true
}

fn compile_pattern(channel: &str, pattern: Option<&str>) -> Result<Option<Regex>, ConfigError> {
    pattern
        .map(|p| {
            Regex::new(p).map_err(|source| ConfigError::Pattern {
                channel: channel.to_string(),
                pattern: p.to_string(),
                source,
            })
        })
        .transpose()
}

/// Complete ruleset of one channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub name: String,
    #[serde(default)]
    pub layout_list: Vec<LayoutRule>,
    #[serde(default)]
    pub desktop: Option<ArticleLayout>,
    #[serde(default)]
    pub mobile: Option<ArticleLayout>,
    #[serde(default)]
    pub mobile_host: Option<HostRewrite>,
    #[serde(default)]
    pub search: Option<SearchConfig>,
}

impl ChannelConfig {
    /// Layout of the first `layout_list` prefix matching `path`, `Mobile` otherwise.
    pub fn detect_layout(&self, path: &str) -> Layout {
        self.layout_list
            .iter()
            .find(|rule| path.starts_with(&rule.prefix))
            .map(|rule| rule.layout)
            .unwrap_or(Layout::Mobile)
    }

    /// Selector set for `layout`, falling back to the other variant when the
    /// channel only publishes one.
    pub fn article_layout(&self, layout: Layout) -> Option<&ArticleLayout> {
        match layout {
            Layout::Desktop => self.desktop.as_ref().or(self.mobile.as_ref()),
            Layout::Mobile => self.mobile.as_ref().or(self.desktop.as_ref()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChannelDocument {
    channels: Vec<ChannelConfig>,
}

/// All known channels, in document order.
#[derive(Debug, Clone)]
pub struct ChannelRegistry {
    channels: Vec<ChannelConfig>,
}

impl ChannelRegistry {
    /// Registry parsed from the compiled-in channel document.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_json(BUILTIN_CHANNELS)
    }

    /// Parse a channel document, compiling its date and page patterns.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut doc: ChannelDocument = serde_json::from_str(json)?;
        for channel in &mut doc.channels {
            if channel.desktop.is_none() && channel.mobile.is_none() {
                return Err(ConfigError::MissingLayout {
                    channel: channel.name.clone(),
                    layout: Layout::Mobile.to_string(),
                });
            }
            for layout in [&mut channel.desktop, &mut channel.mobile].into_iter().flatten() {
                layout.date_regex = compile_pattern(&channel.name, layout.date_pattern.as_deref())?;
            }
            if let Some(search) = &mut channel.search {
                search.date_regex = compile_pattern(&channel.name, search.date_pattern.as_deref())?;
                search.page_regex = compile_pattern(&channel.name, search.page_pattern.as_deref())?;
            }
        }
        debug!(count = doc.channels.len(), "Loaded channel configuration");
        Ok(Self {
            channels: doc.channels,
        })
    }

    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Channel whose key occurs in `path`. First match in document order wins;
    /// `None` means the channel is unsupported.
    pub fn detect_channel(&self, path: &str) -> Option<&str> {
        self.channels
            .iter()
            .find(|c| path.contains(c.name.as_str()))
            .map(|c| c.name.as_str())
    }

    pub fn get(&self, channel: &str) -> Option<&ChannelConfig> {
        self.channels.iter().find(|c| c.name == channel)
    }

    pub fn search_config(&self, channel: &str) -> Option<&SearchConfig> {
        self.get(channel).and_then(|c| c.search.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(|c| c.name.as_str())
    }
}
