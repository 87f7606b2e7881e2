// src/utils/text.rs - Value normalization shared by blocking and matching

use once_cell::sync::Lazy;
use regex::Regex;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("static regex"));

/// Lowercases a value and splits it on any run of non-alphanumeric characters.
pub fn tokenize(value: &str) -> Vec<String> {
    let lowered = value.to_lowercase();
    NON_WORD
        .split(&lowered)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Tokens re-joined with single spaces.
pub fn normalize(value: &str) -> String {
    tokenize(value).join(" ")
}

/// Token n-grams joined with a space. Values shorter than `n` tokens yield
/// the whole token sequence as one gram.
pub fn token_ngrams(value: &str, n: usize) -> Vec<String> {
    let tokens = tokenize(value);
    if tokens.is_empty() {
        return Vec::new();
    }
    if n <= 1 {
        return tokens;
    }
    if tokens.len() < n {
        return vec![tokens.join(" ")];
    }
    tokens.windows(n).map(|w| w.join(" ")).collect()
}

/// Character n-grams over the normalized value (spaces included).
pub fn char_ngrams(value: &str, n: usize) -> Vec<String> {
    let chars: Vec<char> = normalize(value).chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }
    if chars.len() <= n {
        return vec![chars.iter().collect()];
    }
    chars.windows(n).map(|w| w.iter().collect()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_strips_punctuation() {
        assert_eq!(
            tokenize("Apple iPod-Nano (4GB), Silver!"),
            vec!["apple", "ipod", "nano", "4gb", "silver"]
        );
        assert!(tokenize("  --  ").is_empty());
    }

    #[test]
    fn test_token_ngrams() {
        assert_eq!(token_ngrams("a b c", 2), vec!["a b", "b c"]);
        assert_eq!(token_ngrams("solo", 3), vec!["solo"]);
        assert_eq!(token_ngrams("x y", 1), vec!["x", "y"]);
    }

    #[test]
    fn test_char_ngrams() {
        assert_eq!(char_ngrams("Abcd", 3), vec!["abc", "bcd"]);
        assert_eq!(char_ngrams("ab", 3), vec!["ab"]);
        assert!(char_ngrams("", 2).is_empty());
    }
}
