//! Field extraction from a single news page.
//!
//! [`NewsSoup`] takes a URL or local path, works out the channel and layout,
//! loads the page lazily on first access and extracts title, date, author and
//! body text with the channel's selectors. Each field is computed at most
//! once per instance; failures are logged once and yield `None`.
//!
//! # Example
//!
//! ```ignore
//! let ctx = ClientContext::from_options(&ContextOptions::default())?;
//! let mut soup = NewsSoup::new(&ctx, "https://udn.com/news/story/7320/3407294");
//! println!("{:?} {:?}", soup.title().await, soup.author().await);
//! ```

use crate::author::scan_author;
use crate::config::{ArticleLayout, Layout};
use crate::context::ClientContext;
use crate::document::{self, is_remote, Document};
use crate::models::ExtractedFields;
use crate::transport::{Device, Transport};
use crate::utils::{excise_date, parse_datetime, truncate_chars};
use chrono::NaiveDateTime;
use tracing::{debug, error, warn};

/// Extractor bound to one page.
pub struct NewsSoup<'c, T> {
    ctx: &'c ClientContext<T>,
    path: String,
    channel: Option<String>,
    refresh: bool,
    layout: Option<Layout>,
    loaded: bool,
    conf: Option<ArticleLayout>,
    document: Option<Document>,
    fields: ExtractedFields,
}

impl<'c, T: Transport> NewsSoup<'c, T> {
    /// Bind to `path` (URL or local file). No I/O happens until a field is
    /// requested.
    pub fn new(ctx: &'c ClientContext<T>, path: impl Into<String>) -> Self {
        let path = path.into();
        let channel = ctx.channels().detect_channel(&path).map(str::to_string);
        if channel.is_none() {
            error!(%path, "Unsupported news channel, check the channel configuration");
        }
        Self {
            ctx,
            path,
            channel,
            refresh: false,
            layout: None,
            loaded: false,
            conf: None,
            document: None,
            fields: ExtractedFields::default(),
        }
    }

    /// Ignore cached copies when loading.
    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    /// Force a layout instead of deriving it from the URL prefix.
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    /// The page path; normalized once the page has been loaded.
    pub fn path(&self) -> &str {
        &self.path
    }

    async fn ensure_loaded(&mut self) {
        if self.loaded {
            return;
        }
        self.loaded = true;

        let ctx = self.ctx;
        let Some(channel) = self.channel.as_deref() else {
            return;
        };
        let Some(conf) = ctx.channels().get(channel) else {
            return;
        };

        if is_remote(&self.path) {
            self.path = document::normalize_url(
                ctx.transport(),
                Device::Mobile,
                &self.path,
                conf.mobile_host.as_ref(),
            )
            .await;
        }

        let layout = self
            .layout
            .unwrap_or_else(|| conf.detect_layout(&self.path));
        let device = match layout {
            Layout::Desktop => Device::Desktop,
            Layout::Mobile => Device::Mobile,
        };
        debug!(%channel, %layout, path = %self.path, "Loading news page");

        self.conf = conf.article_layout(layout).cloned();
        self.document = document::load(ctx, channel, &self.path, device, self.refresh).await;
    }

    /// Headline, with nested markup stripped.
    pub async fn title(&mut self) -> Option<String> {
        self.ensure_loaded().await;
        let doc = self.document.as_ref()?;
        let conf = self.conf.as_ref()?;
        let channel = self.channel.as_deref().unwrap_or_default();
        self.fields
            .title
            .get_or_init(|| select_field(doc, &conf.title_node, "title", channel, true))
            .clone()
    }

    /// Publication time text as it appears on the page.
    pub async fn date_raw(&mut self) -> Option<String> {
        self.ensure_loaded().await;
        let doc = self.document.as_ref()?;
        let conf = self.conf.as_ref()?;
        let channel = self.channel.as_deref().unwrap_or_default();
        self.fields
            .date_raw
            .get_or_init(|| select_field(doc, &conf.date_node, "date", channel, true))
            .clone()
    }

    /// Publication time parsed with the channel's date format.
    pub async fn date(&mut self) -> Option<NaiveDateTime> {
        let raw = self.date_raw().await;
        let conf = self.conf.as_ref()?;
        let channel = self.channel.as_deref().unwrap_or_default();
        *self.fields.date.get_or_init(|| {
            let raw = raw?;
            let Some(text) = excise_date(&raw, conf.date_regex.as_ref()) else {
                error!(%channel, %raw, pattern = ?conf.date_pattern, "Date pattern does not match");
                return None;
            };
            match parse_datetime(text, &conf.date_format) {
                Ok(date) => Some(date),
                Err(e) => {
                    error!(%channel, %text, format = %conf.date_format, error = %e, "Cannot parse date");
                    None
                }
            }
        })
    }

    /// Reporter or columnist name.
    ///
    /// Channels without a byline element are scanned for one in the body text.
    pub async fn author(&mut self) -> Option<String> {
        self.ensure_loaded().await;
        self.document.as_ref()?;
        let author_node = self.conf.as_ref()?.author_node.clone();

        if !author_node.is_empty() {
            let doc = self.document.as_ref()?;
            let channel = self.channel.as_deref().unwrap_or_default();
            return self
                .fields
                .author
                .get_or_init(|| select_field(doc, &author_node, "author", channel, true))
                .clone();
        }

        let contents = self.contents().await;
        let channel = self.channel.as_deref().unwrap_or_default();
        self.fields
            .author
            .get_or_init(|| match contents {
                Some(text) => {
                    let author = scan_author(&text);
                    if author.is_none() {
                        warn!(%channel, "No byline found in article text");
                    }
                    author
                }
                None => {
                    warn!(%channel, "No article text to scan for a byline");
                    None
                }
            })
            .clone()
    }

    /// Body text: every matched paragraph, trimmed and concatenated in
    /// document order.
    pub async fn contents(&mut self) -> Option<String> {
        self.ensure_loaded().await;
        let doc = self.document.as_ref()?;
        let conf = self.conf.as_ref()?;
        let channel = self.channel.as_deref().unwrap_or_default();
        self.fields
            .contents
            .get_or_init(|| {
                let paragraphs = doc.parsed.root().select_all_text(&conf.article_node);
                if paragraphs.is_empty() {
                    error!(%channel, selector = %conf.article_node, "Article body node not found");
                    return None;
                }
                Some(paragraphs.concat())
            })
            .clone()
    }

    /// Body text cut to at most `limit` characters.
    pub async fn contents_truncated(&mut self, limit: usize) -> Option<String> {
        self.contents()
            .await
            .map(|text| truncate_chars(&text, limit).to_string())
    }

    /// Bytes of title, author, raw date and body over bytes of the page.
    ///
    /// A rough extraction-quality signal; `0.0` when nothing was loaded.
    pub async fn effective_text_rate(&mut self) -> f64 {
        self.ensure_loaded().await;
        let raw_len = match &self.document {
            Some(doc) if doc.raw_len > 0 => doc.raw_len,
            _ => return 0.0,
        };

        let useful: usize = [
            self.title().await,
            self.author().await,
            self.date_raw().await,
            self.contents().await,
        ]
        .iter()
        .flatten()
        .map(String::len)
        .sum();

        useful as f64 / raw_len as f64
    }
}

/// Text of the first node matched by `selector`, logging misses as errors
/// and ambiguous matches as warnings.
fn select_field(
    doc: &Document,
    selector: &str,
    field: &str,
    channel: &str,
    own_only: bool,
) -> Option<String> {
    match doc.parsed.root().select_text(selector, own_only) {
        Some(selected) => {
            if selected.matches > 1 {
                warn!(%channel, field, selector, matches = selected.matches, "Multiple nodes matched, using the first");
            }
            Some(selected.text)
        }
        None => {
            error!(%channel, field, selector, "Node not found");
            None
        }
    }
}
