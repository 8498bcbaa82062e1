//! Uniform access to HTML elements and JSON values.
//!
//! Channel selectors are CSS selectors for HTML pages and `>`-delimited key
//! paths for JSON payloads. [`ResultNode`] hides that difference so field and
//! result extraction is written once: [`HtmlNode`] adapts a `scraper`
//! element, [`JsonNode`] adapts a `serde_json` value walked by [`KeyPath`].
//!
//! Every lookup fails closed: a missing key, an unparsable selector or a
//! value of the wrong shape yields "no match", never a panic.

use scraper::{ElementRef, Selector};
use serde_json::Value;
use tracing::warn;

/// Text of the first node matched by a selector, with the match count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selected {
    pub text: String,
    pub matches: usize,
}

/// A node of a parsed document that selectors can be evaluated against.
pub trait ResultNode {
    /// Trimmed text of the first match. With `own_only`, text inside child
    /// elements is dropped so nested markup cannot leak into the value.
    fn select_text(&self, path: &str, own_only: bool) -> Option<Selected>;

    /// Trimmed text of every match, in document order.
    fn select_all_text(&self, path: &str) -> Vec<String>;

    /// Attribute `attr` of the first match. JSON nodes have no attributes,
    /// so the matched value itself is returned.
    fn select_attr(&self, path: &str, attr: &str) -> Option<String>;

    /// Child nodes matched by `path`, e.g. the repeated hits of a result page.
    fn select_nodes(&self, path: &str) -> Vec<Box<dyn ResultNode + '_>>;
}

fn parse_selector(path: &str) -> Option<Selector> {
    match Selector::parse(path) {
        Ok(selector) => Some(selector),
        Err(e) => {
            warn!(selector = path, error = %e, "Invalid CSS selector");
            None
        }
    }
}

/// Text of the direct text children of `element`.
fn own_text(element: &ElementRef<'_>) -> String {
    element
        .children()
        .filter_map(|child| child.value().as_text())
        .map(|text| &**text)
        .collect()
}

/// HTML element adapter.
#[derive(Debug, Clone, Copy)]
pub struct HtmlNode<'a>(pub ElementRef<'a>);

impl<'a> HtmlNode<'a> {
    fn matches(&self, path: &str) -> Vec<ElementRef<'a>> {
        match parse_selector(path) {
            Some(selector) => self.0.select(&selector).collect(),
            None => Vec::new(),
        }
    }
}

impl ResultNode for HtmlNode<'_> {
    fn select_text(&self, path: &str, own_only: bool) -> Option<Selected> {
        let found = self.matches(path);
        let first = found.first()?;
        let text = if own_only {
            own_text(first)
        } else {
            first.text().collect::<String>()
        };
        Some(Selected {
            text: text.trim().to_string(),
            matches: found.len(),
        })
    }

    fn select_all_text(&self, path: &str) -> Vec<String> {
        self.matches(path)
            .iter()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .collect()
    }

    fn select_attr(&self, path: &str, attr: &str) -> Option<String> {
        self.matches(path)
            .first()
            .and_then(|el| el.value().attr(attr))
            .map(str::to_string)
    }

    fn select_nodes(&self, path: &str) -> Vec<Box<dyn ResultNode + '_>> {
        self.matches(path)
            .into_iter()
            .map(|el| Box::new(HtmlNode(el)) as Box<dyn ResultNode + '_>)
            .collect()
    }
}

/// Typed key path into a JSON tree, parsed from `a > b > c`.
///
/// Array elements are addressed by decimal index. The empty path addresses
/// the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPath(Vec<String>);

impl KeyPath {
    pub fn parse(path: &str) -> Self {
        Self(
            path.split('>')
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Walk the path from `root`; `None` on the first missing key.
    pub fn visit<'v>(&self, root: &'v Value) -> Option<&'v Value> {
        let mut visited = root;
        for key in &self.0 {
            visited = match visited {
                Value::Object(map) => map.get(key)?,
                Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(visited)
    }
}

/// Text form of a scalar JSON value.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// JSON value adapter.
#[derive(Debug, Clone, Copy)]
pub struct JsonNode<'a>(pub &'a Value);

impl<'a> JsonNode<'a> {
    /// Values addressed by `path`; an array is a list of matches.
    fn matches(&self, path: &str) -> Vec<&'a Value> {
        match KeyPath::parse(path).visit(self.0) {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(value) => vec![value],
            None => Vec::new(),
        }
    }
}

impl ResultNode for JsonNode<'_> {
    fn select_text(&self, path: &str, _own_only: bool) -> Option<Selected> {
        let found = self.matches(path);
        let text = scalar_text(found.first()?)?;
        Some(Selected {
            text,
            matches: found.len(),
        })
    }

    fn select_all_text(&self, path: &str) -> Vec<String> {
        self.matches(path).into_iter().filter_map(scalar_text).collect()
    }

    fn select_attr(&self, path: &str, _attr: &str) -> Option<String> {
        self.matches(path).first().and_then(|v| scalar_text(v))
    }

    fn select_nodes(&self, path: &str) -> Vec<Box<dyn ResultNode + '_>> {
        self.matches(path)
            .into_iter()
            .map(|value| Box::new(JsonNode(value)) as Box<dyn ResultNode + '_>)
            .collect()
    }
}
