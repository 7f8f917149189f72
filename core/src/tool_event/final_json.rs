//! Recovers the structured answer an agent left in free-form output.
//!
//! Agents sometimes fence their answer as ```` ```json ````, sometimes use a
//! bare fence, and sometimes just end with raw JSON. The search runs tier by
//! tier and, inside a tier, prefers the last candidate that actually parses.
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

static JSON_FENCE: OnceLock<Regex> = OnceLock::new();
static BARE_FENCE: OnceLock<Regex> = OnceLock::new();
static OBJECT: OnceLock<Regex> = OnceLock::new();
static ARRAY: OnceLock<Regex> = OnceLock::new();

fn json_fence() -> &'static Regex {
    JSON_FENCE.get_or_init(|| {
        Regex::new(r"(?s)```json\s*\n(.*?)\n```").expect("JSON_FENCE regex is valid")
    })
}

fn bare_fence() -> &'static Regex {
    BARE_FENCE
        .get_or_init(|| Regex::new(r"(?s)```\s*\n(.*?)\n```").expect("BARE_FENCE regex is valid"))
}

// One level of nesting is tolerated; deeper objects match their inner part.
fn object_pattern() -> &'static Regex {
    OBJECT.get_or_init(|| {
        Regex::new(r"\{[^{}]*(?:\{[^{}]*\}[^{}]*)*\}").expect("OBJECT regex is valid")
    })
}

fn array_pattern() -> &'static Regex {
    ARRAY.get_or_init(|| {
        Regex::new(r"\[[^\[\]]*(?:\[[^\[\]]*\][^\[\]]*)*\]").expect("ARRAY regex is valid")
    })
}

fn parses(candidate: &str) -> Option<Value> {
    serde_json::from_str::<Value>(candidate).ok()
}

fn is_structured(v: &Value) -> bool {
    v.is_object() || v.is_array()
}

fn last_fenced<F>(re: &Regex, text: &str, accept: F) -> Option<String>
where
    F: Fn(&Value) -> bool,
{
    let blocks: Vec<&str> = re
        .captures_iter(text)
        .filter_map(|c| c.get(1).map(|m| m.as_str().trim()))
        .collect();
    blocks
        .into_iter()
        .rev()
        .find(|block| parses(block).as_ref().is_some_and(&accept))
        .map(str::to_string)
}

fn last_match(re: &Regex, text: &str) -> Option<String> {
    let matches: Vec<&str> = re.find_iter(text).map(|m| m.as_str()).collect();
    matches
        .into_iter()
        .rev()
        .find(|m| parses(m).is_some())
        .map(|m| m.trim().to_string())
}

/// Returns the most likely final JSON payload in `text`, or `None`.
///
/// Never returns a string that fails to parse as JSON.
pub fn extract_final_json(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Already clean JSON: keeps extraction idempotent for deep objects and
    // arrays of objects, which the substring patterns below would split.
    if parses(trimmed).as_ref().is_some_and(is_structured) {
        return Some(trimmed.to_string());
    }

    last_fenced(json_fence(), text, |_| true)
        .or_else(|| last_fenced(bare_fence(), text, is_structured))
        .or_else(|| last_match(object_pattern(), text))
        .or_else(|| last_match(array_pattern(), text))
}
