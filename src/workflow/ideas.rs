//! Extraction of candidate ideas from generated text

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // "<integer>. <rest of line>", anchored at the start of each line
    static ref NUMBERED_ITEM: Regex = Regex::new(r"(?m)^\d+\.[ \t]*(.*)$").unwrap();
}

/// Split a numbered list into its items, in document order.
///
/// Text without any numbered line degrades to a single idea holding the whole
/// text. Blank text yields no ideas.
pub fn parse_ideas(raw: &str) -> Vec<String> {
    let items: Vec<String> = NUMBERED_ITEM
        .captures_iter(raw)
        .filter_map(|captures| captures.get(1))
        .map(|item| item.as_str().trim().to_string())
        .filter(|item| !item.is_empty())
        .collect();

    if !items.is_empty() {
        return items;
    }

    let whole = raw.trim();
    if whole.is_empty() {
        Vec::new()
    } else {
        vec![whole.to_string()]
    }
}
