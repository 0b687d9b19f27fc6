// Unigram normalization for free-text record descriptions.
//
// A description is reduced to the ordered list of its distinct unigrams:
// special characters become spaces, the text is split on whitespace, and
// only the first occurrence of each token is kept. The result is rejoined
// with single spaces so it can be compared, grouped and hashed by value.

use std::collections::HashSet;

/// Characters replaced by a space before splitting, unless configured otherwise.
pub const DEFAULT_SPECIAL_CHARS: &str = ",.-";

/// Reduces raw text to a space-joined sequence of unique unigrams.
#[derive(Debug, Clone)]
pub struct UnigramNormalizer {
    special_chars: Vec<char>,
}

impl Default for UnigramNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_SPECIAL_CHARS)
    }
}

impl UnigramNormalizer {
    /// Build a normalizer that treats every character of `special_chars` as a separator.
    pub fn new(special_chars: &str) -> Self {
        Self {
            special_chars: special_chars.chars().collect(),
        }
    }

    /// Normalize a possibly-null string. Null input yields the empty string.
    ///
    /// Tokens keep their case and the order of their first appearance;
    /// later repeats are dropped.
    pub fn normalize(&self, text: Option<&str>) -> String {
        let Some(text) = text else {
            return String::new();
        };

        let cleaned: String = text
            .chars()
            .map(|c| if self.special_chars.contains(&c) { ' ' } else { c })
            .collect();

        let mut seen: HashSet<&str> = HashSet::new();
        let unigrams: Vec<&str> = cleaned
            .split_whitespace()
            .filter(|token| seen.insert(token))
            .collect();

        unigrams.join(" ")
    }
}
