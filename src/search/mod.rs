//! Keyword search over a channel's search endpoint.
//!
//! A [`NewsSearch`] validates its query parameters up front, then
//! [`by_keyword`](NewsSearch::by_keyword) walks result pages until the limit
//! is reached, a page comes back empty, or a date-bounded search reaches
//! results older than its window. Results are de-duplicated by link and
//! can be projected to plain records or to [`NewsSoup`] extractors.
//!
//! # Example
//!
//! ```ignore
//! let options = SearchOptions { limit: 10, ..Default::default() };
//! let mut search = NewsSearch::new(&ctx, "udn", &options)?;
//! for item in search.by_keyword("上吊", false).await.to_dict_list() {
//!     println!("{} {}", item.date, item.title);
//! }
//! ```

mod dedup;
mod jump;
mod link;

pub use dedup::filter_duplicated;
pub use jump::{page_span, read_last_page, PageSpan};
pub use link::{base_url, normalize_link};

use crate::config::SearchConfig;
use crate::context::ClientContext;
use crate::document::ParsedDocument;
use crate::error::{JumpError, LoadError, SearchError};
use crate::models::SearchResultItem;
use crate::node::ResultNode;
use crate::soup::NewsSoup;
use crate::transport::{Device, Transport};
use crate::utils::{encode_keyword, encode_query_token, excise_date, parse_datetime, render_date, truncate_for_log};
use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

const ISO_DATE: &str = "%Y-%m-%d";

/// Parameters of a search session.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Maximum number of results collected before de-duplication.
    pub limit: usize,
    /// First day of the date window, `yyyy-mm-dd`.
    pub beg_date: Option<String>,
    /// Last day of the date window (inclusive), `yyyy-mm-dd`.
    pub end_date: Option<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 25,
            beg_date: None,
            end_date: None,
        }
    }
}

/// Calendar days a search is restricted to, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub begin: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Earliest accepted publication time.
    pub fn lower(&self) -> NaiveDateTime {
        self.begin.and_time(NaiveTime::MIN)
    }

    /// First publication time past the window.
    pub fn upper(&self) -> NaiveDateTime {
        self.end
            .checked_add_days(Days::new(1))
            .unwrap_or(self.end)
            .and_time(NaiveTime::MIN)
    }

    pub fn contains(&self, date: NaiveDateTime) -> bool {
        date >= self.lower() && date < self.upper()
    }
}

/// Outcome of fetching one result page.
#[derive(Debug)]
pub(crate) enum PageFetch {
    Page(ParsedDocument),
    /// The endpoint has no further pages.
    NoMore,
    Failed(String),
}

/// Search session bound to one channel.
pub struct NewsSearch<'c, T> {
    ctx: &'c ClientContext<T>,
    channel: String,
    conf: SearchConfig,
    limit: usize,
    window: Option<DateWindow>,
    host: Option<String>,
    results: Vec<SearchResultItem>,
    pages: u32,
    elapsed: Duration,
}

impl<'c, T: Transport> NewsSearch<'c, T> {
    /// Validate `options` for `channel`. Fails before any network I/O.
    pub fn new(ctx: &'c ClientContext<T>, channel: &str, options: &SearchOptions) -> Result<Self, SearchError> {
        let channel_conf = ctx.channels().get(channel).ok_or_else(|| SearchError::UnknownChannel {
            channel: channel.to_string(),
        })?;
        let conf = match &channel_conf.search {
            Some(conf) if conf.enabled => conf.clone(),
            _ => {
                return Err(SearchError::SearchUnsupported {
                    channel: channel.to_string(),
                })
            }
        };

        let window = validate_window(channel, &conf, options)?;
        let host = Url::parse(&conf.url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string));

        Ok(Self {
            ctx,
            channel: channel.to_string(),
            conf,
            limit: options.limit,
            window,
            host,
            results: Vec::new(),
            pages: 0,
            elapsed: Duration::ZERO,
        })
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn window(&self) -> Option<DateWindow> {
        self.window
    }

    /// Run the search, replacing the results of any previous run.
    ///
    /// With `title_only`, hits whose title does not contain `keyword` are
    /// dropped.
    #[instrument(level = "info", skip(self), fields(channel = %self.channel))]
    pub async fn by_keyword(&mut self, keyword: &str, title_only: bool) -> &mut Self {
        let started = Instant::now();
        self.results.clear();
        self.pages = 0;

        let mut page = self.start_page(keyword).await;
        let mut collected: Vec<SearchResultItem> = Vec::new();

        'pages: while collected.len() < self.limit {
            let url = self.query_url(keyword, page);
            self.pages += 1;

            let doc = match self.fetch_page(&url).await {
                PageFetch::Page(doc) => doc,
                PageFetch::NoMore => break,
                PageFetch::Failed(reason) => {
                    warn!(page, %url, %reason, "Search page failed, keeping results so far");
                    break;
                }
            };

            let root = doc.root();
            let nodes = root.select_nodes(&self.conf.result_node);
            if nodes.is_empty() {
                debug!(page, "No result nodes, end of results");
                break;
            }
            let base = base_url(root.as_ref(), &url);

            for node in &nodes {
                let Some(item) = self.read_item(node.as_ref(), &base, page) else {
                    continue;
                };
                if let Some(window) = self.window {
                    if item.date < window.lower() {
                        debug!(page, date = %item.date, "Reached results older than the window");
                        break 'pages;
                    }
                    if !window.contains(item.date) {
                        continue;
                    }
                }
                if title_only && !item.title.contains(keyword) {
                    continue;
                }
                collected.push(item);
                if collected.len() >= self.limit {
                    break 'pages;
                }
            }
            page += 1;
        }

        self.results = filter_duplicated(collected);
        self.elapsed = started.elapsed();
        info!(
            results = self.results.len(),
            pages = self.pages,
            elapsed_ms = self.elapsed.as_millis() as u64,
            "Search finished"
        );
        self
    }

    /// The de-duplicated results of the last run.
    pub fn to_dict_list(&self) -> &[SearchResultItem] {
        &self.results
    }

    /// One extractor per result link, sharing this session's context.
    pub fn to_soup_list(&self) -> Vec<NewsSoup<'c, T>> {
        self.results
            .iter()
            .map(|item| NewsSoup::new(self.ctx, item.link.clone()))
            .collect()
    }

    /// Result pages requested by the last run.
    pub fn pages(&self) -> u32 {
        self.pages
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    async fn start_page(&self, keyword: &str) -> u32 {
        let Some(window) = self.window else {
            return 1;
        };
        if !self.conf.page_jump {
            return 1;
        }
        match self.find_start_page(keyword, window).await {
            Ok(page) => {
                info!(page, "Jumping to first result page of the date window");
                page
            }
            Err(e @ JumpError::NonMonotonic { .. }) => {
                error!(error = %e, "Page jump aborted, scanning from page 1");
                1
            }
            Err(e) => {
                warn!(error = %e, "Page jump unavailable, scanning from page 1");
                1
            }
        }
    }

    fn query_url(&self, keyword: &str, page: u32) -> String {
        let mut url = self
            .conf
            .url
            .replace("${PAGE}", &page.to_string())
            .replace("${KEYWORD}", &encode_keyword(keyword));

        if let Some(window) = self.window {
            let tokens = [
                (window.begin, self.conf.begin_date_format.as_deref()),
                (window.end, self.conf.end_date_format.as_deref()),
            ];
            for (date, format) in tokens {
                let Some(format) = format else {
                    continue;
                };
                match render_date(date, format) {
                    Some(token) => url.push_str(&encode_query_token(&token)),
                    None => warn!(channel = %self.channel, format, "Invalid date range format, token skipped"),
                }
            }
        }
        url
    }

    #[instrument(level = "debug", skip(self))]
    async fn fetch_page(&self, url: &str) -> PageFetch {
        let resp = match self.ctx.transport().get(Device::Mobile, url).await {
            Ok(resp) => resp,
            Err(e) => return PageFetch::Failed(e.to_string()),
        };

        match resp.status {
            200 if !resp.is_json() && !resp.is_html() => {
                PageFetch::Failed(format!("unexpected content type {:?}", resp.content_type))
            }
            200 => match ParsedDocument::parse(&resp.body, resp.is_json()) {
                Ok(doc) => PageFetch::Page(doc),
                Err(LoadError::Empty) => {
                    debug!("Empty result page");
                    PageFetch::NoMore
                }
                Err(e) => {
                    debug!(body = %truncate_for_log(&resp.body, 200), "Unparsable result page");
                    PageFetch::Failed(e.to_string())
                }
            },
            404 => {
                debug!("404 Not Found, no more results");
                PageFetch::NoMore
            }
            status => PageFetch::Failed(format!("unexpected HTTP status {status}")),
        }
    }

    /// Title, link and date of one result node. Incomplete hits are logged
    /// and skipped.
    fn read_item(&self, node: &dyn ResultNode, base: &str, page: u32) -> Option<SearchResultItem> {
        let channel = self.channel.as_str();

        let Some(title) = node.select_text(&self.conf.title_node, false).map(|s| s.text) else {
            warn!(channel, page, selector = %self.conf.title_node, "Search result without title");
            return None;
        };
        let link = node
            .select_attr(&self.conf.link_node, "href")
            .and_then(|href| normalize_link(&href, self.host.as_deref(), base));
        let Some(link) = link else {
            warn!(channel, page, %title, selector = %self.conf.link_node, "Search result without usable link");
            return None;
        };
        let Some(date) = node_date(node, &self.conf) else {
            warn!(channel, page, %link, selector = %self.conf.date_node, "Search result without parsable date");
            return None;
        };

        Some(SearchResultItem { title, link, date })
    }
}

/// Publication time of a result node.
pub(crate) fn node_date(node: &dyn ResultNode, conf: &SearchConfig) -> Option<NaiveDateTime> {
    let raw = node.select_text(&conf.date_node, false)?.text;
    let text = excise_date(&raw, conf.date_regex.as_ref())?;
    parse_datetime(text, &conf.date_format).ok()
}

fn parse_iso_date(value: &str) -> Result<NaiveDate, SearchError> {
    let invalid = || SearchError::InvalidDate {
        value: value.to_string(),
    };
    if value.len() != 10 {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(value, ISO_DATE).map_err(|_| invalid())
}

fn validate_window(
    channel: &str,
    conf: &SearchConfig,
    options: &SearchOptions,
) -> Result<Option<DateWindow>, SearchError> {
    let (begin, end) = match (options.beg_date.as_deref(), options.end_date.as_deref()) {
        (None, None) => return Ok(None),
        _ if !conf.date_range => {
            return Err(SearchError::DateRangeUnsupported {
                channel: channel.to_string(),
            })
        }
        (None, Some(end)) => return Err(SearchError::MissingBeginDate { end: end.to_string() }),
        (Some(begin), None) => return Err(SearchError::MissingEndDate { begin: begin.to_string() }),
        (Some(begin), Some(end)) => (begin, end),
    };

    let window = DateWindow {
        begin: parse_iso_date(begin)?,
        end: parse_iso_date(end)?,
    };
    let days = (window.end - window.begin).num_days();
    if days < 0 {
        return Err(SearchError::ReversedRange {
            begin: begin.to_string(),
            end: end.to_string(),
        });
    }
    if let Some(max_days) = conf.max_span_days {
        if days > max_days {
            return Err(SearchError::SpanTooLong {
                channel: channel.to_string(),
                max_days,
                days,
            });
        }
    }
    Ok(Some(window))
}
