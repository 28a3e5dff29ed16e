//! Action-name pattern matching
//!
//! Patterns support a single `*` at the start, the end, both, or neither:
//! `*move*` (contains), `*stick` (suffix), `walk*` (prefix), `jump` (exact).
//! There is no `?` and no mid-string wildcard.

/// Case-insensitive glob match. An empty pattern matches nothing.
///
/// # Example
///
/// ```
/// use openstride_filters::matches_pattern;
///
/// assert!(matches_pattern("LeftHand_Move", "*move*"));
/// assert!(!matches_pattern("jump", "*move*"));
/// assert!(!matches_pattern("", "*x*"));
/// ```
pub fn matches_pattern(text: &str, pattern: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }
    let text = text.to_lowercase();
    let pattern = pattern.to_lowercase();

    let (core, start_wild) = match pattern.strip_prefix('*') {
        Some(rest) => (rest, true),
        None => (pattern.as_str(), false),
    };
    let (core, end_wild) = match core.strip_suffix('*') {
        Some(rest) => (rest, true),
        // a lone "*" leaves nothing to strip but still ends with a wildcard
        None => (core, start_wild && pattern.len() == 1),
    };

    match (start_wild, end_wild) {
        (true, true) => text.contains(core),
        (true, false) => text.ends_with(core),
        (false, true) => text.starts_with(core),
        (false, false) => text == core,
    }
}

/// True when `text` matches any pattern in the ordered list.
pub fn any_pattern_matches<S: AsRef<str>>(text: &str, patterns: &[S]) -> bool {
    patterns
        .iter()
        .any(|pattern| matches_pattern(text, pattern.as_ref()))
}
