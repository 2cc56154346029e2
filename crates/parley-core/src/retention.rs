//! Retention policy: which messages get persisted.

/// Keyword a message must contain (in any letter case) to be kept.
pub const RETENTION_KEYWORD: &str = "key";

/// Returns `true` when `text` contains [`RETENTION_KEYWORD`], ignoring case.
pub fn should_retain(text: &str) -> bool {
    text.to_lowercase().contains(RETENTION_KEYWORD)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn matches_keyword_in_any_case() {
        assert!(should_retain("my Key is 123"));
        assert!(should_retain("KEY"));
        assert!(should_retain("the monkey ate it"));
        assert!(should_retain("kEy-value store"));
    }

    #[test]
    fn rejects_text_without_keyword() {
        assert!(!should_retain("hello there"));
        assert!(!should_retain(""));
        assert!(!should_retain("k e y"));
    }
}
