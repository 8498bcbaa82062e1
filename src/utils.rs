//! Small helpers shared by extraction and search.
//!
//! - Date parsing with strftime formats, tolerant of date-only formats
//! - Date excision from noisy text via a configured regex
//! - Query-string encoding for keywords and date range tokens
//! - Log-friendly truncation of response bodies

use chrono::{NaiveDate, NaiveDateTime, ParseResult};
use regex::Regex;
use url::form_urlencoded;

/// Parse `text` with a strftime `format`.
///
/// Channels that only publish a calendar date (`%Y/%m/%d`) parse to
/// midnight of that day.
///
/// # Examples
///
/// ```ignore
/// let dt = parse_datetime("2018/11/28 14:21", "%Y/%m/%d %H:%M").unwrap();
/// let day = parse_datetime("2018/11/28", "%Y/%m/%d").unwrap();
/// ```
pub fn parse_datetime(text: &str, format: &str) -> ParseResult<NaiveDateTime> {
    match NaiveDateTime::parse_from_str(text, format) {
        Ok(dt) => Ok(dt),
        Err(full_err) => match NaiveDate::parse_from_str(text, format) {
            Ok(date) => Ok(date.and_time(chrono::NaiveTime::MIN)),
            Err(_) => Err(full_err),
        },
    }
}

/// Render `date` with a strftime `format`; `None` if the format is invalid.
pub fn render_date(date: NaiveDate, format: &str) -> Option<String> {
    use std::fmt::Write;
    let mut rendered = String::new();
    write!(rendered, "{}", date.format(format)).ok()?;
    Some(rendered)
}

/// Cut the date substring out of `text` when a pattern is configured,
/// otherwise return the trimmed text.
///
/// Returns `None` when the pattern does not match.
pub fn excise_date<'a>(text: &'a str, pattern: Option<&Regex>) -> Option<&'a str> {
    match pattern {
        Some(re) => re.find(text).map(|m| m.as_str()),
        None => Some(text.trim()),
    }
}

/// Encode a search keyword the way HTML forms do (spaces become `+`).
pub fn encode_keyword(keyword: &str) -> String {
    form_urlencoded::byte_serialize(keyword.as_bytes()).collect()
}

/// Percent-encode a rendered query fragment such as `&sdate=2020/02/01`,
/// keeping its `&` and `=` delimiters intact.
pub fn encode_query_token(token: &str) -> String {
    token
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            ),
            None => urlencoding::encode(pair).into_owned(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut after `max` characters and a byte count indicator
/// is appended. Cuts always land on a character boundary.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Cut `s` to at most `limit` characters.
pub fn truncate_chars(s: &str, limit: usize) -> &str {
    match s.char_indices().nth(limit) {
        None => s,
        Some((cut, _)) => &s[..cut],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_datetime_full() {
        let dt = parse_datetime("2018-10-15 23:51", "%Y-%m-%d %H:%M").unwrap();
        assert_eq!(dt.hour(), 23);
        assert_eq!(dt.minute(), 51);
    }

    #[test]
    fn test_parse_datetime_date_only_is_midnight() {
        let dt = parse_datetime("2018/11/28", "%Y/%m/%d").unwrap();
        assert_eq!(dt.day(), 28);
        assert_eq!(dt.hour(), 0);
    }

    #[test]
    fn test_parse_datetime_with_cjk_literals() {
        let dt = parse_datetime("出版時間：2018/12/01 00:00", "出版時間：%Y/%m/%d %H:%M").unwrap();
        assert_eq!(dt.year(), 2018);
        assert_eq!(dt.month(), 12);
    }

    #[test]
    fn test_parse_datetime_mismatch() {
        assert!(parse_datetime("yesterday", "%Y-%m-%d %H:%M").is_err());
        assert!(parse_datetime("2018-10-15 23:51 extra", "%Y-%m-%d %H:%M").is_err());
    }

    #[test]
    fn test_render_date() {
        let date = NaiveDate::from_ymd_opt(2020, 2, 1).unwrap();
        assert_eq!(render_date(date, "&sdate=%Y%m%d").as_deref(), Some("&sdate=20200201"));
        assert_eq!(render_date(date, "%Q"), None);
    }

    #[test]
    fn test_excise_date() {
        let text = "社會 2019-03-02 10:20 三立新聞";
        let minutes = Regex::new(r"\d{4}-\d{2}-\d{2} \d{2}:\d{2}").unwrap();
        assert_eq!(excise_date(text, Some(&minutes)), Some("2019-03-02 10:20"));
        assert_eq!(excise_date("  2019-03-02  ", None), Some("2019-03-02"));
        assert_eq!(excise_date("no date", Some(&minutes)), None);
    }

    #[test]
    fn test_encode_keyword() {
        assert_eq!(encode_keyword("酒駕"), "%E9%85%92%E9%A7%95");
        assert_eq!(encode_keyword("a b"), "a+b");
    }

    #[test]
    fn test_encode_query_token() {
        assert_eq!(encode_query_token("&sdate=2020/02/01"), "&sdate=2020%2F02%2F01");
        assert_eq!(encode_query_token("&start_time=20200201"), "&start_time=20200201");
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("上吊", 100), "上吊");
    }

    #[test]
    fn test_truncate_for_log_multibyte() {
        let result = truncate_for_log("台北市萬華區", 2);
        assert!(result.starts_with("台北"));
        assert!(result.contains("…(+12 bytes)"));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("台北市萬華區", 3), "台北市");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
