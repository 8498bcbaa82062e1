//! Removal of results repeated across adjacent result pages.

use crate::models::SearchResultItem;
use std::collections::HashMap;
use tracing::warn;

/// Keep the first occurrence of every link, in result order.
///
/// Sites that publish while a search is being paged shift their results,
/// so the tail of one page shows up again at the head of the next.
pub fn filter_duplicated(items: Vec<SearchResultItem>) -> Vec<SearchResultItem> {
    let mut first_seen: HashMap<String, usize> = HashMap::with_capacity(items.len());
    let mut kept = Vec::with_capacity(items.len());

    for (index, item) in items.into_iter().enumerate() {
        if let Some(&first) = first_seen.get(&item.link) {
            warn!(index, first, link = %item.link, "Dropped duplicated search result");
            continue;
        }
        first_seen.insert(item.link.clone(), index);
        kept.push(item);
    }
    kept
}
