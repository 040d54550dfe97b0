//! Helpers for pulling structured content out of collaborator replies

use regex::Regex;
use std::sync::OnceLock;

/// A fenced block: info string (may be empty) and body with trailing newline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FencedBlock<'a> {
    pub lang: &'a str,
    pub body: &'a str,
    /// Byte range of the whole block including fences
    pub span: (usize, usize),
}

fn fence_regex() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?ms)^```([\w+.-]*)[ \t]*\r?\n(.*?)^```[ \t]*\r?$").ok())
        .as_ref()
}

/// All ``` fenced blocks whose fences start a line
pub fn fenced_blocks(text: &str) -> Vec<FencedBlock<'_>> {
    let Some(re) = fence_regex() else {
        return Vec::new();
    };

    re.captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(FencedBlock {
                lang: caps.get(1).map(|m| m.as_str()).unwrap_or_default(),
                body: caps.get(2).map(|m| m.as_str()).unwrap_or_default(),
                span: (whole.start(), whole.end()),
            })
        })
        .collect()
}

/// JSON object text: a ```json fence if present, else the outermost braces
pub fn extract_json(text: &str) -> Option<&str> {
    let fenced = fenced_blocks(text)
        .into_iter()
        .find(|b| b.lang.eq_ignore_ascii_case("json") || b.body.trim_start().starts_with('{'));
    if let Some(block) = fenced {
        return Some(block.body.trim());
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}
