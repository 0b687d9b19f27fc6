// Lexical primitives: unigram normalization and set-overlap scoring.

pub mod normalize;
pub mod overlap;
