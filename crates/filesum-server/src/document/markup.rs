use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Node};
use std::path::Path;

use super::text::decode_text;
use crate::utils::error::ExtractError;

static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"#{1,6}\s+").expect("valid regex"));
static EMPHASIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*{1,2}(.*?)\*{1,2}").expect("valid regex"));
static LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").expect("valid regex"));
static CODE_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"```[\s\S]*?```").expect("valid regex"));
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").expect("valid regex"));

/// Elements whose text never shows up on a rendered page
const HIDDEN_ELEMENTS: [&str; 5] = ["script", "style", "noscript", "template", "head"];

/// Strip markdown syntax. Order is fixed: fenced blocks go before inline code
/// is unwrapped, otherwise the fence backticks would be eaten first.
pub fn strip_markdown(text: &str) -> String {
    let text = HEADING.replace_all(text, "");
    let text = EMPHASIS.replace_all(&text, "$1");
    let text = LINK.replace_all(&text, "$1");
    let text = CODE_BLOCK.replace_all(&text, "");
    let text = INLINE_CODE.replace_all(&text, "$1");
    text.trim().to_string()
}

pub(crate) fn extract_markdown(path: &Path) -> Result<String, ExtractError> {
    let raw = std::fs::read(path)?;
    let content = String::from_utf8(raw)
        .map_err(|e| ExtractError::DecodeError(format!("Markdown is not valid UTF-8: {}", e)))?;
    Ok(strip_markdown(&content))
}

/// Visible text of an HTML document: no tags, no script/style bodies.
pub fn extract_visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut text = String::new();

    for node in document.root_element().descendants() {
        let Node::Text(fragment) = node.value() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .filter_map(|ancestor| ancestor.value().as_element())
            .any(|element| HIDDEN_ELEMENTS.contains(&element.name()));
        if !hidden {
            text.push_str(fragment);
        }
    }

    // Cleanup: remove excessive whitespace
    text.lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn extract_html(path: &Path) -> Result<String, ExtractError> {
    let raw = std::fs::read(path)?;
    let (content, _) = decode_text(&raw)?;
    Ok(extract_visible_text(&content))
}
