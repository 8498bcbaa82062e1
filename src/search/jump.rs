//! Binary-search page jump for date-bounded searches.
//!
//! Channels with large result sets sorted newest first can locate the page
//! where a date window starts in `O(log pages)` fetches instead of paging
//! through every newer result. The jump relies on results being sorted by
//! date across pages; any page that contradicts that ordering aborts the
//! jump with [`JumpError::NonMonotonic`] rather than guessing a page.

use super::{node_date, DateWindow, NewsSearch, PageFetch};
use crate::config::SearchConfig;
use crate::error::JumpError;
use crate::node::ResultNode;
use crate::transport::Transport;
use chrono::NaiveDateTime;
use itertools::Itertools;
use tracing::debug;

/// Newest and oldest result dates of one result page, plus the total page
/// count when the page shows one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpan {
    pub newest: NaiveDateTime,
    pub oldest: NaiveDateTime,
    pub last_page: Option<u32>,
}

impl PageSpan {
    /// Whether this span sits between `before` (a lower page number) and
    /// `after` (a higher one) in a newest-first ordering.
    fn fits_between(&self, before: &PageSpan, after: &PageSpan) -> bool {
        before.oldest >= self.newest && self.oldest >= after.newest
    }
}

/// Read the dates of every result on a page.
pub fn page_span(root: &dyn ResultNode, conf: &SearchConfig, page: u32) -> Result<PageSpan, JumpError> {
    let dates: Vec<NaiveDateTime> = root
        .select_nodes(&conf.result_node)
        .iter()
        .filter_map(|node| node_date(node.as_ref(), conf))
        .collect();

    let (Some(&newest), Some(&oldest)) = (dates.first(), dates.last()) else {
        return Err(JumpError::Undated { page });
    };
    if !dates.iter().tuple_windows().all(|(a, b)| a >= b) {
        return Err(JumpError::NonMonotonic { page });
    }

    Ok(PageSpan {
        newest,
        oldest,
        last_page: read_last_page(root, conf),
    })
}

/// Total page count from the `last_page` element: its `href`, or its text
/// when it has none, narrowed by `page_pattern` when one is configured.
pub fn read_last_page(root: &dyn ResultNode, conf: &SearchConfig) -> Option<u32> {
    let selector = conf.last_page.as_deref()?;
    let raw = root
        .select_attr(selector, "href")
        .or_else(|| root.select_text(selector, false).map(|s| s.text))?;

    let digits = match &conf.page_regex {
        Some(re) => {
            let caps = re.captures(&raw)?;
            caps.get(1).or_else(|| caps.get(0))?.as_str().to_string()
        }
        None => raw.trim().to_string(),
    };
    digits.parse().ok()
}

impl<T: Transport> NewsSearch<'_, T> {
    async fn fetch_span(&self, keyword: &str, page: u32) -> Result<PageSpan, JumpError> {
        let url = self.query_url(keyword, page);
        match self.fetch_page(&url).await {
            PageFetch::Page(doc) => page_span(doc.root().as_ref(), &self.conf, page),
            PageFetch::NoMore => Err(JumpError::Undated { page }),
            PageFetch::Failed(reason) => Err(JumpError::Fetch { page, reason }),
        }
    }

    /// First result page worth scanning for `window`.
    ///
    /// Pages before the returned one only hold results newer than the
    /// window. The page itself may still start with newer results, which
    /// the scan skips.
    pub(super) async fn find_start_page(&self, keyword: &str, window: DateWindow) -> Result<u32, JumpError> {
        let upper = window.upper();

        let first = self.fetch_span(keyword, 1).await?;
        if first.oldest < upper {
            return Ok(1);
        }
        let last_page = first.last_page.ok_or(JumpError::NoPageCount)?;
        if last_page <= 1 {
            return Ok(1);
        }

        let last = self.fetch_span(keyword, last_page).await?;
        if last.newest > first.oldest {
            return Err(JumpError::NonMonotonic { page: last_page });
        }
        if last.oldest >= upper {
            return Ok(last_page);
        }

        let (mut lower, mut upper_page) = (1, last_page);
        loop {
            let mid = lower + (upper_page - lower) / 2;
            if mid == lower {
                break;
            }
            let span = self.fetch_span(keyword, mid).await?;
            if !span.fits_between(&first, &last) {
                return Err(JumpError::NonMonotonic { page: mid });
            }
            debug!(page = mid, newest = %span.newest, oldest = %span.oldest, lower, upper = upper_page, "Probed result page");

            if span.oldest >= upper {
                lower = mid;
            } else if span.newest < upper {
                upper_page = mid;
            } else {
                return Ok(mid);
            }
        }
        Ok(lower)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelRegistry;
    use scraper::Html;

    fn ltn_conf() -> SearchConfig {
        ChannelRegistry::builtin()
            .unwrap()
            .search_config("ltn")
            .cloned()
            .unwrap()
    }

    fn page(dates: &[&str], last: Option<&str>) -> Html {
        let items: String = dates
            .iter()
            .enumerate()
            .map(|(i, d)| {
                format!(r#"<li><a class="tit" href="/news/{i}">新聞{i}</a><span class="time">{d}</span></li>"#)
            })
            .collect();
        let pagination = last
            .map(|href| format!(r#"<div class="pagination"><a class="p_last" href="{href}">最末頁</a></div>"#))
            .unwrap_or_default();
        Html::parse_document(&format!(
            r#"<html><body><ul class="searchlist">{items}</ul>{pagination}</body></html>"#
        ))
    }

    #[test]
    fn test_page_span_and_last_page() {
        let html = page(
            &["2020/03/05", "2020/03/04", "2020/03/04", "2020/03/01"],
            Some("https://news.ltn.com.tw/search?keyword=x&page=37"),
        );
        let span = page_span(&crate::node::HtmlNode(html.root_element()), &ltn_conf(), 1).unwrap();
        assert_eq!(span.newest.to_string(), "2020-03-05 00:00:00");
        assert_eq!(span.oldest.to_string(), "2020-03-01 00:00:00");
        assert_eq!(span.last_page, Some(37));
    }

    #[test]
    fn test_page_span_rejects_ascending_page() {
        let html = page(&["2020/03/01", "2020/03/05"], None);
        assert_eq!(
            page_span(&crate::node::HtmlNode(html.root_element()), &ltn_conf(), 4),
            Err(JumpError::NonMonotonic { page: 4 })
        );
    }

    #[test]
    fn test_page_span_without_dates() {
        let html = page(&[], None);
        assert_eq!(
            page_span(&crate::node::HtmlNode(html.root_element()), &ltn_conf(), 2),
            Err(JumpError::Undated { page: 2 })
        );
    }

    #[test]
    fn test_read_last_page_from_text() {
        let mut conf = ltn_conf();
        conf.page_pattern = None;
        conf.page_regex = None;
        conf.last_page = Some("span.total".into());
        let html = Html::parse_document(r#"<span class="total"> 12 </span>"#);
        assert_eq!(read_last_page(&crate::node::HtmlNode(html.root_element()), &conf), Some(12));

        conf.last_page = Some("span.missing".into());
        assert_eq!(read_last_page(&crate::node::HtmlNode(html.root_element()), &conf), None);
    }
}
