//! Resolving a path or URL to a parsed document.
//!
//! Remote URLs are normalized first (redirects walked with `HEAD`, scheme
//! forced to `https`, desktop hosts of mobile-only channels rewritten), then
//! served from the page cache when possible. Local paths are read directly;
//! a `.gz` suffix means gzip, a `.json` stem means a JSON payload.
//!
//! Loading never fails loudly: every problem is logged once and reported as
//! `None`.

use crate::cache::{read_gzip, CacheKey};
use crate::config::HostRewrite;
use crate::context::ClientContext;
use crate::error::LoadError;
use crate::node::{HtmlNode, JsonNode, ResultNode};
use crate::transport::{Device, Transport};
use scraper::Html;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, error, instrument, warn};
use url::Url;

const MAX_REDIRECTS: usize = 10;

/// A parsed HTML tree or JSON value.
#[derive(Debug)]
pub enum ParsedDocument {
    Html(Html),
    Json(Value),
}

impl ParsedDocument {
    /// Parse `text`; empty input and malformed JSON are errors. HTML parsing
    /// is error-correcting and always succeeds on non-empty input.
    pub fn parse(text: &str, json: bool) -> Result<Self, LoadError> {
        if text.trim().is_empty() {
            return Err(LoadError::Empty);
        }
        if json {
            Ok(Self::Json(serde_json::from_str(text)?))
        } else {
            Ok(Self::Html(Html::parse_document(text)))
        }
    }

    /// Root node to evaluate selectors against.
    pub fn root(&self) -> Box<dyn ResultNode + '_> {
        match self {
            Self::Html(html) => Box::new(HtmlNode(html.root_element())),
            Self::Json(value) => Box::new(JsonNode(value)),
        }
    }
}

/// A parsed document and the byte length of the decoded text it came from.
#[derive(Debug)]
pub struct Document {
    pub parsed: ParsedDocument,
    pub raw_len: usize,
}

impl Document {
    fn from_text(text: &str, json: bool) -> Result<Self, LoadError> {
        Ok(Self {
            parsed: ParsedDocument::parse(text, json)?,
            raw_len: text.len(),
        })
    }
}

pub fn is_remote(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

/// `http://` becomes `https://`; anything else is returned as is.
pub fn force_https(url: &str) -> String {
    match url.strip_prefix("http://") {
        Some(rest) => {
            let new_url = format!("https://{rest}");
            debug!(from = url, to = %new_url, "Forced https");
            new_url
        }
        None => url.to_string(),
    }
}

/// Swap the desktop host prefix of a mobile-only channel for its mobile host.
pub fn rewrite_mobile_host(url: &str, rewrite: &HostRewrite) -> String {
    match url.strip_prefix(rewrite.from.as_str()) {
        Some(rest) => {
            let new_url = format!("{}{}", rewrite.to, rest);
            debug!(from = url, to = %new_url, "Rewrote to mobile host");
            new_url
        }
        None => url.to_string(),
    }
}

/// Walk `3xx` responses to the terminal URL.
///
/// A non-redirect, non-200 status or a connection failure ends the walk at
/// the last URL reached. These are only logged at debug level; the load that
/// follows reports the failure.
#[instrument(level = "debug", skip(transport))]
pub async fn follow_redirection<T: Transport>(transport: &T, device: Device, url: &str) -> String {
    let mut current = url.to_string();
    for _ in 0..MAX_REDIRECTS {
        let resp = match transport.head(device, &current).await {
            Ok(resp) => resp,
            Err(e) => {
                debug!(url = %current, error = %e, "Connection failed while resolving redirects");
                return current;
            }
        };
        match resp.status {
            200 => return current,
            300..=399 => {
                let Some(location) = resp.location else {
                    debug!(url = %current, status = resp.status, "Redirect without Location header");
                    return current;
                };
                let next = match Url::parse(&current).and_then(|base| base.join(&location)) {
                    Ok(joined) => joined.to_string(),
                    Err(_) => location,
                };
                debug!(from = %current, to = %next, "Followed redirect");
                current = next;
            }
            status => {
                debug!(url = %current, status, "Unexpected status while resolving redirects");
                return current;
            }
        }
    }
    debug!(url = %current, max = MAX_REDIRECTS, "Too many redirects");
    current
}

/// Full URL normalization applied before a remote load.
pub async fn normalize_url<T: Transport>(
    transport: &T,
    device: Device,
    url: &str,
    mobile_host: Option<&HostRewrite>,
) -> String {
    let resolved = follow_redirection(transport, device, url).await;
    let secured = force_https(&resolved);
    match mobile_host {
        Some(rewrite) => rewrite_mobile_host(&secured, rewrite),
        None => secured,
    }
}

/// Path and query of `url`, the part of a URL that identifies a page within
/// its channel.
fn uri_of(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => match parsed.query() {
            Some(query) => format!("{}?{}", parsed.path(), query),
            None => parsed.path().to_string(),
        },
        Err(_) => url.to_string(),
    }
}

/// Load `path` (URL or local file) for `channel`.
///
/// Remote URLs must already be normalized. With `refresh`, the cache is
/// bypassed on read but still written.
#[instrument(level = "info", skip(ctx))]
pub async fn load<T: Transport>(
    ctx: &ClientContext<T>,
    channel: &str,
    path: &str,
    device: Device,
    refresh: bool,
) -> Option<Document> {
    let result = if is_remote(path) {
        load_remote(ctx, channel, path, device, refresh).await
    } else {
        load_file(Path::new(path))
    };

    match result {
        Ok(doc) => {
            debug!(raw_len = doc.raw_len, "Loaded document");
            Some(doc)
        }
        Err(e) => {
            error!(%path, error = %e, "Cannot load news document");
            None
        }
    }
}

async fn load_remote<T: Transport>(
    ctx: &ClientContext<T>,
    channel: &str,
    url: &str,
    device: Device,
    refresh: bool,
) -> Result<Document, LoadError> {
    let uri = uri_of(url);

    if !refresh {
        for json in [false, true] {
            let key = CacheKey::new(channel, &uri, json);
            if !ctx.cache().has(&key) {
                continue;
            }
            debug!(key = key.as_str(), "Cache hit");
            match ctx.cache().load(&key) {
                Ok(text) => return Document::from_text(&text, key.is_json()),
                Err(e) => warn!(key = key.as_str(), error = %e, "Unreadable cache entry, fetching again"),
            }
        }
    }

    debug!(%url, "GET");
    let resp = ctx.transport().get(device, url).await?;
    if resp.status != 200 {
        return Err(LoadError::Status {
            status: resp.status,
        });
    }

    let json = resp.is_json();
    let doc = Document::from_text(&resp.body, json)?;
    let key = CacheKey::new(channel, &uri, json);
    if let Err(e) = ctx.cache().save(&key, &resp.body) {
        warn!(key = key.as_str(), error = %e, "Cannot write cache entry");
    }
    Ok(doc)
}

fn load_file(path: &Path) -> Result<Document, LoadError> {
    let name = path.to_string_lossy();
    let (text, stem) = match name.strip_suffix(".gz") {
        Some(stem) => (read_gzip(path)?, stem),
        None => (std::fs::read_to_string(path)?, &*name),
    };
    Document::from_text(&text, stem.ends_with(".json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::GzipFileCache;
    use crate::config::ChannelRegistry;
    use crate::context::testing::mock_context;
    use crate::transport::mock::MockTransport;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const PAGE: &str = "<html><body><h1>新聞</h1></body></html>";

    #[test]
    fn test_force_https() {
        assert_eq!(force_https("http://news.ltn.com.tw/a"), "https://news.ltn.com.tw/a");
        assert_eq!(force_https("https://udn.com/a"), "https://udn.com/a");
    }

    #[test]
    fn test_rewrite_mobile_host() {
        let rewrite = HostRewrite {
            from: "https://news.ltn.com.tw".into(),
            to: "https://m.ltn.com.tw".into(),
        };
        assert_eq!(
            rewrite_mobile_host("https://news.ltn.com.tw/news/society/breakingnews/2581807", &rewrite),
            "https://m.ltn.com.tw/news/society/breakingnews/2581807"
        );
        assert_eq!(
            rewrite_mobile_host("https://sports.ltn.com.tw/news/1", &rewrite),
            "https://sports.ltn.com.tw/news/1"
        );
    }

    #[test]
    fn test_uri_of() {
        assert_eq!(uri_of("https://udn.com/news/story/7320/3407294"), "/news/story/7320/3407294");
        assert_eq!(uri_of("https://a.tw/search?q=1"), "/search?q=1");
    }

    #[tokio::test]
    async fn test_normalize_follows_redirects_then_rewrites() {
        let transport = MockTransport::new()
            .redirect("http://news.ltn.com.tw/news/1", "http://news.ltn.com.tw/news/society/1");
        let rewrite = HostRewrite {
            from: "https://news.ltn.com.tw".into(),
            to: "https://m.ltn.com.tw".into(),
        };
        let url = normalize_url(&transport, Device::Mobile, "http://news.ltn.com.tw/news/1", Some(&rewrite)).await;
        assert_eq!(url, "https://m.ltn.com.tw/news/society/1");
    }

    #[tokio::test]
    async fn test_host_relative_redirect() {
        let transport = MockTransport::new().redirect("https://udn.com/old", "/news/story/1/2");
        let url = follow_redirection(&transport, Device::Desktop, "https://udn.com/old").await;
        assert_eq!(url, "https://udn.com/news/story/1/2");
    }

    #[tokio::test]
    async fn test_remote_load_and_cache() {
        let dir = tempfile::tempdir().unwrap();
        let url = "https://udn.com/news/story/7320/3407294";
        let ctx = ClientContext::new(
            MockTransport::new().html(url, PAGE),
            Box::new(GzipFileCache::new(dir.path()).unwrap()),
            ChannelRegistry::builtin().unwrap(),
        );

        let doc = load(&ctx, "udn", url, Device::Desktop, false).await.unwrap();
        assert_eq!(doc.raw_len, PAGE.len());
        assert!(matches!(doc.parsed, ParsedDocument::Html(_)));
        assert_eq!(ctx.transport().get_count(), 1);

        // Second load is served from the cache.
        load(&ctx, "udn", url, Device::Desktop, false).await.unwrap();
        assert_eq!(ctx.transport().get_count(), 1);

        // Refresh bypasses it.
        load(&ctx, "udn", url, Device::Desktop, true).await.unwrap();
        assert_eq!(ctx.transport().get_count(), 2);
    }

    #[tokio::test]
    async fn test_remote_non_200_is_none() {
        let ctx = mock_context(MockTransport::new().status("https://udn.com/gone", 500));
        assert!(load(&ctx, "udn", "https://udn.com/gone", Device::Desktop, false).await.is_none());
        assert!(load(&ctx, "udn", "https://udn.com/missing", Device::Desktop, false).await.is_none());
    }

    #[tokio::test]
    async fn test_remote_json_document() {
        let url = "https://udn.com/api/article/1";
        let ctx = mock_context(MockTransport::new().json(url, r#"{"title": "標題"}"#));
        let doc = load(&ctx, "udn", url, Device::Desktop, false).await.unwrap();
        assert!(matches!(doc.parsed, ParsedDocument::Json(_)));
    }

    #[tokio::test]
    async fn test_local_files() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = mock_context(MockTransport::new());

        let plain = dir.path().join("udn.html");
        std::fs::write(&plain, PAGE).unwrap();
        let doc = load(&ctx, "udn", &plain.to_string_lossy(), Device::Mobile, false).await.unwrap();
        assert_eq!(doc.raw_len, PAGE.len());

        let gz = dir.path().join("ltn.html.gz");
        let mut encoder = GzEncoder::new(std::fs::File::create(&gz).unwrap(), Compression::default());
        encoder.write_all(PAGE.as_bytes()).unwrap();
        encoder.finish().unwrap();
        let doc = load(&ctx, "ltn", &gz.to_string_lossy(), Device::Mobile, false).await.unwrap();
        assert_eq!(doc.raw_len, PAGE.len());
        assert!(matches!(doc.parsed, ParsedDocument::Html(_)));

        let json = dir.path().join("udn.json");
        std::fs::write(&json, r#"{"title": "x"}"#).unwrap();
        let doc = load(&ctx, "udn", &json.to_string_lossy(), Device::Mobile, false).await.unwrap();
        assert!(matches!(doc.parsed, ParsedDocument::Json(_)));

        assert_eq!(ctx.transport().get_count(), 0);
    }

    #[tokio::test]
    async fn test_local_failures_are_none() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = mock_context(MockTransport::new());

        let missing = dir.path().join("appledaily-notexisted.html");
        assert!(load(&ctx, "appledaily", &missing.to_string_lossy(), Device::Mobile, false).await.is_none());

        let empty = dir.path().join("appledaily-empty.html");
        std::fs::write(&empty, "").unwrap();
        assert!(load(&ctx, "appledaily", &empty.to_string_lossy(), Device::Mobile, false).await.is_none());

        let empty_gz = dir.path().join("appledaily-empty.html.gz");
        std::fs::write(&empty_gz, "").unwrap();
        assert!(load(&ctx, "appledaily", &empty_gz.to_string_lossy(), Device::Mobile, false).await.is_none());

        let bad_json = dir.path().join("udn-bad.json");
        std::fs::write(&bad_json, "{not json").unwrap();
        assert!(load(&ctx, "udn", &bad_json.to_string_lossy(), Device::Mobile, false).await.is_none());
    }
}
