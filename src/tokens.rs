//! Approximate token accounting.
//!
//! There is no tokenizer here: a token is counted as four characters, which is
//! close enough for budgeting how much crawled text fits in a prompt.

/// Characters per estimated token
pub const CHARS_PER_TOKEN: usize = 4;

/// Estimate the token cost of a span as `floor(chars / 4)`.
///
/// Length is measured in Unicode scalar values, not bytes.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / CHARS_PER_TOKEN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_floors() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcdefg"), 1);
        assert_eq!(estimate_tokens(&"x".repeat(400)), 100);
    }

    #[test]
    fn test_estimate_counts_chars_not_bytes() {
        // four two-byte characters
        assert_eq!(estimate_tokens("éééé"), 1);
        assert_eq!(estimate_tokens("日本語のテキスト"), 2);
    }
}
