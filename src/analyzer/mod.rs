pub mod features;
pub mod intent;

use std::sync::LazyLock;

use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};

pub use features::{FeatureVector, analyze};
pub use intent::{SearchIntent, extract_intent};

/// Preference text beyond this many bytes is ignored.
pub const MAX_INPUT_BYTES: usize = 4096;

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\p{L}\p{N}_]+").unwrap());

static STEMMER: LazyLock<Stemmer> = LazyLock::new(|| Stemmer::create(Algorithm::English));

/// A lower-cased word together with its stem.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub word: String,
    pub stem: String,
}

impl Token {
    /// Fuzzy keyword test against the stem.
    pub fn contains(&self, keyword: &str) -> bool {
        self.stem.contains(keyword)
    }
}

/// Cap preference text at [`MAX_INPUT_BYTES`], cutting on a char boundary.
pub fn clamp_input(text: &str) -> &str {
    if text.len() <= MAX_INPUT_BYTES {
        return text;
    }
    let mut end = MAX_INPUT_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Lower-case, split into words, and stem each word.
pub fn tokenize(text: &str) -> Vec<Token> {
    let lower = clamp_input(text).to_lowercase();
    WORD_RE
        .find_iter(&lower)
        .map(|m| {
            let word = m.as_str().to_string();
            let stem = STEMMER.stem(&word).into_owned();
            Token { word, stem }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_splits_on_punctuation() {
        let words: Vec<String> = tokenize("Hip-Hop, R&B and  jazz!")
            .into_iter()
            .map(|t| t.word)
            .collect();
        assert_eq!(words, vec!["hip", "hop", "r", "b", "and", "jazz"]);
    }

    #[test]
    fn test_stems_reduce_to_root() {
        let tokens = tokenize("energetic dancing");
        assert_eq!(tokens[0].stem, "energet");
        assert_eq!(tokens[1].stem, "danc");
    }

    #[test]
    fn test_contains_checks_stem_only() {
        let tokens = tokenize("happy");
        assert_eq!(tokens[0].word, "happy");
        assert!(tokens[0].contains("happi"));
        assert!(!tokens[0].contains("happy"));
        assert!(!tokens[0].contains("sad"));
    }

    #[test]
    fn test_clamp_input_respects_char_boundaries() {
        let long = "é".repeat(MAX_INPUT_BYTES);
        let clamped = clamp_input(&long);
        assert!(clamped.len() <= MAX_INPUT_BYTES);
        assert!(clamped.chars().all(|c| c == 'é'));

        assert_eq!(clamp_input("short"), "short");
    }

    #[test]
    fn test_tokenize_empty_text() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  ...  ").is_empty());
    }
}
