//! Data models produced by extraction and search.
//!
//! - [`SearchResultItem`]: one hit of a keyword search
//! - [`ExtractedFields`]: memoized fields of one news page

use chrono::NaiveDateTime;
use once_cell::unsync::OnceCell;
use serde::{Deserialize, Serialize};

/// A single search hit.
///
/// Created while parsing a result page, de-duplicated by `link` before it is
/// handed to the caller. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub title: String,
    /// Absolute `https://` URL of the article.
    pub link: String,
    pub date: NaiveDateTime,
}

/// Per-page field cache.
///
/// Each cell is filled at most once. A cell holding `None` records a failed
/// extraction, so the failure is neither retried nor logged twice.
#[derive(Debug, Default)]
pub struct ExtractedFields {
    pub title: OnceCell<Option<String>>,
    pub date_raw: OnceCell<Option<String>>,
    pub date: OnceCell<Option<NaiveDateTime>>,
    pub author: OnceCell<Option<String>>,
    pub contents: OnceCell<Option<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn item() -> SearchResultItem {
        SearchResultItem {
            title: "清晨起床發現父親上吊天花板".to_string(),
            link: "https://udn.com/news/story/7320/3407294".to_string(),
            date: NaiveDate::from_ymd_opt(2018, 10, 6)
                .unwrap()
                .and_hms_opt(15, 45, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_search_result_serialization() {
        let json = serde_json::to_string(&item()).unwrap();
        assert!(json.contains("\"link\":\"https://udn.com/news/story/7320/3407294\""));
        assert!(json.contains("2018-10-06T15:45:00"));
    }

    #[test]
    fn test_search_result_deserialization() {
        let json = r#"{
            "title": "清晨起床發現父親上吊天花板",
            "link": "https://udn.com/news/story/7320/3407294",
            "date": "2018-10-06T15:45:00"
        }"#;
        let parsed: SearchResultItem = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, item());
    }

    #[test]
    fn test_extracted_fields_fill_once() {
        let fields = ExtractedFields::default();
        assert_eq!(fields.title.get_or_init(|| Some("a".into())).as_deref(), Some("a"));
        assert_eq!(fields.title.get_or_init(|| Some("b".into())).as_deref(), Some("a"));
        assert_eq!(fields.author.get_or_init(|| None), &None);
        assert!(fields.author.get().is_some());
    }
}
