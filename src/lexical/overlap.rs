// Unigram overlap score between two normalized strings.
//
// Both sides are treated as sets of tokens. The score is the size of the
// intersection divided by the mean of the two set sizes:
//
//   |A ∩ B| / ((|A| + |B|) / 2)
//
// This gives 0.0 for disjoint vocabularies and 1.0 for identical ones.
// Two empty sets have no defined ratio; they score 0.0.

use std::collections::HashSet;

/// Result of comparing two normalized strings.
#[derive(Debug, Clone, PartialEq)]
pub struct UnigramOverlap {
    /// Ratio in `[0, 1]`
    pub ratio: f64,
    /// Shared tokens, comma-joined, in order of first appearance in the first input
    pub shared: String,
}

/// Score the unigram overlap of two normalized strings.
pub fn unigrams_in_common(tokens_1: &str, tokens_2: &str) -> UnigramOverlap {
    let mut seen_1: HashSet<&str> = HashSet::new();
    let ordered_1: Vec<&str> = tokens_1
        .split_whitespace()
        .filter(|t| seen_1.insert(t))
        .collect();
    let set_2: HashSet<&str> = tokens_2.split_whitespace().collect();

    let shared: Vec<&str> = ordered_1
        .iter()
        .copied()
        .filter(|t| set_2.contains(t))
        .collect();

    let mean_size = (seen_1.len() + set_2.len()) as f64 / 2.0;
    let ratio = if mean_size == 0.0 {
        0.0
    } else {
        shared.len() as f64 / mean_size
    };

    UnigramOverlap {
        ratio,
        shared: shared.join(","),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_overlap() {
        let result = unigrams_in_common("a b", "b c");
        assert!((result.ratio - 0.5).abs() < 1e-12);
        assert_eq!(result.shared, "b");
    }

    #[test]
    fn test_identical() {
        let result = unigrams_in_common("a b", "a b");
        assert!((result.ratio - 1.0).abs() < 1e-12);
        assert_eq!(result.shared, "a,b");
    }

    #[test]
    fn test_both_empty_scores_zero() {
        let result = unigrams_in_common("", "");
        assert_eq!(result.ratio, 0.0);
        assert_eq!(result.shared, "");
    }

    #[test]
    fn test_one_empty_scores_zero() {
        let result = unigrams_in_common("", "a b c");
        assert_eq!(result.ratio, 0.0);
        assert!(result.shared.is_empty());
    }

    #[test]
    fn test_uneven_sizes() {
        // sizes 1 and 3, intersection 1 -> 1 / 2
        let result = unigrams_in_common("pump", "pump valve seal");
        assert!((result.ratio - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_is_symmetric_in_ratio() {
        let ab = unigrams_in_common("steel bolt m8", "m8 nut steel");
        let ba = unigrams_in_common("m8 nut steel", "steel bolt m8");
        assert!((ab.ratio - ba.ratio).abs() < 1e-12);
        assert_eq!(ab.shared, "steel,m8");
        assert_eq!(ba.shared, "m8,steel");
    }

    #[test]
    fn test_repeated_tokens_count_once() {
        let result = unigrams_in_common("a a b", "a");
        // sets {a,b} and {a}: 1 / 1.5
        assert!((result.ratio - 1.0 / 1.5).abs() < 1e-12);
        assert_eq!(result.shared, "a");
    }
}
