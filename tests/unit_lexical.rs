// Unit tests for unigram normalization and overlap scoring.
//
// Tests isolated pure functions: UnigramNormalizer invariants over a range
// of inputs, and unigrams_in_common reference values and edge cases.

use std::collections::HashSet;

use label_overlap::lexical::normalize::UnigramNormalizer;
use label_overlap::lexical::overlap::unigrams_in_common;

// ============================================================
// UnigramNormalizer: invariants
// ============================================================

const SAMPLES: [&str; 8] = [
    "",
    "a, a.a-a",
    "HP LaserJet 4200 toner, HP toner cartridge",
    "  leading and trailing   ",
    "m8-m8-m8.bolt,bolt",
    "Câble électrique, câble",
    "x.y-z,x y z",
    "PO 4411 - PO 4411 - freight",
];

#[test]
fn normalized_output_has_no_repeated_tokens() {
    let normalizer = UnigramNormalizer::default();
    for sample in SAMPLES {
        let out = normalizer.normalize(Some(sample));
        let tokens: Vec<&str> = out.split(' ').filter(|t| !t.is_empty()).collect();
        let unique: HashSet<&str> = tokens.iter().copied().collect();
        assert_eq!(tokens.len(), unique.len(), "repeats in {out:?} from {sample:?}");
    }
}

#[test]
fn normalized_output_preserves_first_occurrence_order() {
    let normalizer = UnigramNormalizer::default();
    for sample in SAMPLES {
        let out = normalizer.normalize(Some(sample));
        let cleaned = sample.replace([',', '.', '-'], " ");
        let mut expected: Vec<&str> = Vec::new();
        for token in cleaned.split_whitespace() {
            if !expected.contains(&token) {
                expected.push(token);
            }
        }
        assert_eq!(out, expected.join(" "), "order mismatch for {sample:?}");
    }
}

#[test]
fn normalized_output_is_idempotent() {
    let normalizer = UnigramNormalizer::default();
    for sample in SAMPLES {
        let once = normalizer.normalize(Some(sample));
        let twice = normalizer.normalize(Some(&once));
        assert_eq!(once, twice);
    }
}

#[test]
fn null_normalizes_to_empty() {
    assert_eq!(UnigramNormalizer::default().normalize(None), "");
}

#[test]
fn separators_collapse_to_single_token() {
    assert_eq!(UnigramNormalizer::default().normalize(Some("a, a.a-a")), "a");
}

// ============================================================
// unigrams_in_common: reference values
// ============================================================

#[test]
fn half_overlap_reference() {
    let result = unigrams_in_common("a b", "b c");
    assert!((result.ratio - 0.5).abs() < 1e-12);
    assert_eq!(result.shared, "b");
}

#[test]
fn full_overlap_reference() {
    let result = unigrams_in_common("a b", "a b");
    assert!((result.ratio - 1.0).abs() < 1e-12);
    assert!(result.shared == "a,b" || result.shared == "b,a");
}

#[test]
fn empty_pair_has_defined_zero_score() {
    let result = unigrams_in_common("", "");
    assert_eq!(result.ratio, 0.0);
}

#[test]
fn ratio_stays_in_unit_interval() {
    let normalizer = UnigramNormalizer::default();
    for a in SAMPLES {
        for b in SAMPLES {
            let ratio = unigrams_in_common(
                &normalizer.normalize(Some(a)),
                &normalizer.normalize(Some(b)),
            )
            .ratio;
            assert!(
                (0.0..=1.0).contains(&ratio),
                "ratio {ratio} out of range for {a:?} vs {b:?}"
            );
        }
    }
}

#[test]
fn shared_tokens_are_the_intersection() {
    let result = unigrams_in_common("toner cartridge black hp", "hp black ink");
    let shared: HashSet<&str> = result.shared.split(',').collect();
    assert_eq!(shared, HashSet::from(["black", "hp"]));
    // 2 shared, sizes 4 and 3
    assert!((result.ratio - 2.0 / 3.5).abs() < 1e-12);
}
