//! Turning result hrefs into absolute `https://` article links.

use crate::node::ResultNode;
use url::Url;

/// Resolve `href` found on a result page.
///
/// - `https://` links pass through, `http://` links are upgraded
/// - protocol-relative `//host/path` gets the `https:` scheme
/// - host-rooted `/path` is rooted at the channel's search `host`
/// - anything else is joined onto `base`, collapsing `.` and `..` segments
///
/// `None` when the link cannot be made absolute.
pub fn normalize_link(href: &str, host: Option<&str>, base: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    if href.starts_with("https://") {
        return Some(href.to_string());
    }
    if let Some(rest) = href.strip_prefix("http://") {
        return Some(format!("https://{rest}"));
    }
    if let Some(rest) = href.strip_prefix("//") {
        return Some(format!("https://{rest}"));
    }
    if href.starts_with('/') {
        return host.map(|host| format!("https://{host}{href}"));
    }
    Url::parse(base)
        .and_then(|base| base.join(href))
        .ok()
        .map(String::from)
}

/// Base URL for relative links on a result page: the page's `<base href>`
/// when there is exactly one, otherwise the query URL itself.
pub fn base_url(page: &dyn ResultNode, query_url: &str) -> String {
    if page.select_nodes("head > base").len() != 1 {
        return query_url.to_string();
    }
    page.select_attr("head > base", "href")
        .and_then(|href| Url::parse(query_url).and_then(|q| q.join(&href)).ok())
        .map(String::from)
        .unwrap_or_else(|| query_url.to_string())
}
