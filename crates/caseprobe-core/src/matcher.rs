//! Identifier matching: exact text first, then a token-wise fuzzy pattern.

use crate::driver::{Query, TextMatch};

/// Alphanumeric runs of an identifier, in order.
pub fn tokens(identifier: &str) -> Vec<String> {
    identifier
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Any character that is neither a letter nor a digit, in every script.
const FILLER: &str = r"[^\p{L}\p{N}]";

/// Pattern accepting any non-alphanumeric filler between the identifier's
/// tokens.
///
/// `12/34-56` accepts `12 / 34 - 56` but not `1 2 34 56`: tokens themselves
/// are never split. Letters count in every script, so `abc-12` does not
/// match inside `żabc 12`. `\b` and `\W` are avoided because browsers read
/// them as ASCII-only.
pub fn fuzzy_pattern(identifier: &str) -> Option<String> {
    let tokens = tokens(identifier);
    if tokens.is_empty() {
        return None;
    }
    let body = tokens
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join(&format!("{}*", FILLER));
    Some(format!("(?:^|{f}){}(?:{f}|$)", body, f = FILLER))
}

pub fn exact_query(identifier: &str) -> Query {
    Query::Text(TextMatch::contains(identifier.trim()))
}

pub fn fuzzy_query(identifier: &str) -> Option<Query> {
    fuzzy_pattern(identifier).map(|p| Query::Text(TextMatch::pattern(p)))
}

/// Whether `text` contains the identifier, exactly or fuzzily.
pub fn matches(identifier: &str, text: &str) -> bool {
    if TextMatch::contains(identifier.trim()).matches(text) {
        return true;
    }
    fuzzy_pattern(identifier).is_some_and(|p| TextMatch::pattern(p).matches(text))
}
