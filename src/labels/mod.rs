// Label indexing and pairing: which labels exist, how often, and which
// pairs of them get compared.

pub mod frequency;
pub mod pairs;
