//! Local fallback token estimator, used only when an upstream omits
//! `eval_count` on its final chunk. Modeled on the grapheme-based heuristic
//! the Ollama client backend uses for multilingual text: backends hosted by
//! this proxy are not guaranteed to be English-only, so a byte-length
//! estimate would systematically undercount CJK and Devanagari output.

use unicode_segmentation::UnicodeSegmentation;

/// Estimates the number of tokens in `text` without a real tokenizer.
pub fn estimate_tokens(text: &str) -> i64 {
    let grapheme_count = text.graphemes(true).count();
    if grapheme_count == 0 {
        return 0;
    }

    let dense_script_count = text
        .chars()
        .filter(|c| {
            ('\u{0900}'..='\u{097F}').contains(c) // Devanagari
                || ('\u{4E00}'..='\u{9FFF}').contains(c) // CJK unified ideographs
        })
        .count();

    let tokens = if dense_script_count > grapheme_count / 3 {
        grapheme_count.max(1) / 2
    } else {
        grapheme_count.max(1) / 4
    };
    tokens.max(1) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimates_english_by_roughly_four_chars_per_token() {
        let text = "the quick brown fox jumps over the lazy dog";
        let estimate = estimate_tokens(text);
        assert!(estimate > 5 && estimate < 20, "got {estimate}");
    }

    #[test]
    fn never_returns_zero_for_nonempty_text() {
        assert_eq!(estimate_tokens("a"), 1);
    }

    #[test]
    fn returns_zero_for_empty_text() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn weighs_dense_scripts_more_heavily_per_grapheme() {
        let cjk = "你好世界你好世界你好世界你好世界";
        let latin = "abcdefghijklmnopqr";
        assert!(estimate_tokens(cjk) > estimate_tokens(latin) / 2);
    }
}
