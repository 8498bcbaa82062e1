//! Byline scanning for channels without an author element.
//!
//! Taiwanese outlets put the reporter's name inside the first paragraph,
//! e.g. `（王覺一／台北報導）`, `記者吳奕靖／高雄報導` or the CNA dateline
//! `（中央社記者吳睿騏桃園5日電）`. Desk credits such as `地方中心／綜合報導`
//! follow the same shape but do not name a person and are rejected.

use once_cell::sync::Lazy;
use regex::Regex;

/// Byline patterns, tried in order; group 1 is the name.
static BYLINE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\((.{2,5})／.+報導\)",
        r"（(.{2,5})／.+報導）",
        r"記者(.{2,5})／.+報導",
        r"中心(.{2,5})／.+報導",
        r"記者(.{2,3}).{2}[縣市]?\d{1,2}日電",
        r"（譯者：(.{2,5})/.+）",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Desk names that are not personal bylines.
const DESK_NAMES: &[&str] = &["國際中心", "地方中心", "社會中心"];

/// Find the reporter's name in article text.
pub fn scan_author(text: &str) -> Option<String> {
    BYLINE_PATTERNS
        .iter()
        .filter_map(|re| re.captures(text))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .find(|name| !DESK_NAMES.contains(name))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_patterns_compile() {
        assert_eq!(BYLINE_PATTERNS.len(), 6);
    }

    #[test]
    fn test_bylines_found() {
        let samples = [
            ("(王覺一／台北報導)", "王覺一"),
            ("（林文彬／綜合外電報導）", "林文彬"),
            ("（中央社記者吳睿騏桃園5日電）", "吳睿騏"),
            ("（中央社記者黃國芳嘉義縣17日電）", "黃國芳"),
            ("（中央社東京5日綜合外電報導）日本軟銀（譯者：何宏儒/核稿：劉學源）", "何宏儒"),
            ("記者吳奕靖／高雄報導", "吳奕靖"),
            ("〔記者梁偉銘／台北報導〕", "梁偉銘"),
            ("［記者江志雄／宜蘭報導］", "江志雄"),
            ("記者於慶璇／台中報導", "於慶璇"),
        ];
        for (text, name) in samples {
            assert_eq!(scan_author(text).as_deref(), Some(name), "{text}");
        }
    }

    #[test]
    fn test_desk_credits_rejected() {
        let samples = [
            "（國際中心／綜合外電報導）",
            "（中央社伊斯坦堡/日內瓦5日綜合外電報導）",
            "地方中心／嘉義報導",
            "〔即時新聞／綜合報導〕",
            "社會中心／綜合報導",
            "（地方中心／綜合報導）",
            "（社會中心／綜合報導）",
            "〔地方中心／綜合報導〕",
            "〔社會中心／綜合報導〕",
        ];
        for text in samples {
            assert_eq!(scan_author(text), None, "{text}");
        }
    }

    #[test]
    fn test_byline_inside_body() {
        let body = "台北市萬華區今早發生火警。（王覺一／台北報導）消防隊到場後迅速撲滅。";
        assert_eq!(scan_author(body).as_deref(), Some("王覺一"));
    }
}
