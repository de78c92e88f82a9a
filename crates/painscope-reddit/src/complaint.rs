//! Complaint-indicator heuristic used to bound scrape volume before
//! persistence.

/// Fixed complaint-indicator terms, matched as case-insensitive substrings.
pub(crate) const COMPLAINT_INDICATORS: &[&str] = &[
    "hate",
    "frustrated",
    "annoying",
    "terrible",
    "worst",
    "awful",
    "disappointed",
    "wish there was",
    "sucks",
    "useless",
    "broken",
    "doesn't work",
    "pain",
    "problem",
    "issue",
    "bug",
    "fail",
];

/// Whether `text` contains at least one complaint-indicator term.
///
/// Empty text never matches.
#[must_use]
pub fn has_complaint_indicators(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    let lower = text.to_lowercase();
    COMPLAINT_INDICATORS.iter().any(|kw| lower.contains(kw))
}

/// Whether `text` contains at least one of the caller-supplied keywords,
/// matched as case-insensitive substrings. Returns the matched keyword so it
/// can be recorded in the item's metadata.
#[must_use]
pub fn matched_keyword<'a>(text: &str, keywords: &'a [String]) -> Option<&'a str> {
    let lower = text.to_lowercase();
    keywords
        .iter()
        .find(|kw| lower.contains(&kw.to_lowercase()))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_never_matches() {
        assert!(!has_complaint_indicators(""));
    }

    #[test]
    fn neutral_text_does_not_match() {
        assert!(!has_complaint_indicators("launched our new dashboard today"));
    }

    #[test]
    fn single_indicator_matches() {
        assert!(has_complaint_indicators("the export feature is broken"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert!(has_complaint_indicators("this app is TERRIBLE"));
    }

    #[test]
    fn multi_word_indicator_matches() {
        assert!(has_complaint_indicators(
            "wish there was a faster alternative"
        ));
    }

    #[test]
    fn indicator_inside_a_word_matches_as_substring() {
        // "failure" contains "fail"; substring semantics are intentional.
        assert!(has_complaint_indicators("constant failure to sync"));
    }

    #[test]
    fn matched_keyword_returns_the_hit() {
        let keywords = vec!["slow".to_string(), "crash".to_string()];
        assert_eq!(
            matched_keyword("the app keeps CRASHING on login", &keywords),
            Some("crash")
        );
    }

    #[test]
    fn matched_keyword_misses_cleanly() {
        let keywords = vec!["slow".to_string()];
        assert_eq!(matched_keyword("works great for me", &keywords), None);
    }

    #[test]
    fn matched_keyword_with_empty_list_is_none() {
        assert_eq!(matched_keyword("anything at all", &[]), None);
    }
}
